//! Operating mode vocabulary
//!
//! Modes are the ADIF major modes. Submodes fold into their parent mode
//! (USB → SSB, FT4 → MFSK) because several services report only the
//! parent. The LoTW mode groups PHONE, DATA and IMAGE are kept as
//! pseudo-modes that match any mode of the group.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse mode family, as used by services that do not distinguish modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ModeGroup {
    Cw,
    Phone,
    Data,
    Image,
}

/// Operating mode (ADIF major mode)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    Cw,
    Ssb,
    Am,
    Fm,
    #[serde(rename = "DIGITALVOICE")]
    DigitalVoice,
    Rtty,
    Psk,
    Mfsk,
    Ft8,
    Jt65,
    Jt9,
    Olivia,
    Contesti,
    Hell,
    Sstv,
    Fax,
    /// LoTW "PHONE" mode group
    Phone,
    /// LoTW "DATA" mode group
    Data,
    /// LoTW "IMAGE" mode group
    Image,
    /// Mode value not recognized (raw value kept by the caller)
    Unknown,
}

const MAJOR_MODES: &[(&str, Mode)] = &[
    ("CW", Mode::Cw),
    ("SSB", Mode::Ssb),
    ("AM", Mode::Am),
    ("FM", Mode::Fm),
    ("DIGITALVOICE", Mode::DigitalVoice),
    ("RTTY", Mode::Rtty),
    ("PSK", Mode::Psk),
    ("MFSK", Mode::Mfsk),
    ("FT8", Mode::Ft8),
    ("JT65", Mode::Jt65),
    ("JT9", Mode::Jt9),
    ("OLIVIA", Mode::Olivia),
    ("CONTESTI", Mode::Contesti),
    ("HELL", Mode::Hell),
    ("SSTV", Mode::Sstv),
    ("FAX", Mode::Fax),
    ("PHONE", Mode::Phone),
    ("DATA", Mode::Data),
    ("IMAGE", Mode::Image),
];

/// Submode → major mode, per the ADIF submode table (common subset)
const SUBMODES: &[(&str, Mode)] = &[
    ("USB", Mode::Ssb),
    ("LSB", Mode::Ssb),
    ("PCW", Mode::Cw),
    ("C4FM", Mode::DigitalVoice),
    ("DMR", Mode::DigitalVoice),
    ("DSTAR", Mode::DigitalVoice),
    ("FREEDV", Mode::DigitalVoice),
    ("M17", Mode::DigitalVoice),
    ("ASCI", Mode::Rtty),
    ("PSK31", Mode::Psk),
    ("PSK63", Mode::Psk),
    ("PSK125", Mode::Psk),
    ("BPSK31", Mode::Psk),
    ("QPSK31", Mode::Psk),
    ("FT4", Mode::Mfsk),
    ("FST4", Mode::Mfsk),
    ("JS8", Mode::Mfsk),
    ("Q65", Mode::Mfsk),
    ("MFSK16", Mode::Mfsk),
    ("JT9-1", Mode::Jt9),
    ("OLIVIA 8/250", Mode::Olivia),
    ("OLIVIA 16/500", Mode::Olivia),
    ("FMHELL", Mode::Hell),
];

impl Mode {
    /// ADIF name of the mode
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Cw => "CW",
            Mode::Ssb => "SSB",
            Mode::Am => "AM",
            Mode::Fm => "FM",
            Mode::DigitalVoice => "DIGITALVOICE",
            Mode::Rtty => "RTTY",
            Mode::Psk => "PSK",
            Mode::Mfsk => "MFSK",
            Mode::Ft8 => "FT8",
            Mode::Jt65 => "JT65",
            Mode::Jt9 => "JT9",
            Mode::Olivia => "OLIVIA",
            Mode::Contesti => "CONTESTI",
            Mode::Hell => "HELL",
            Mode::Sstv => "SSTV",
            Mode::Fax => "FAX",
            Mode::Phone => "PHONE",
            Mode::Data => "DATA",
            Mode::Image => "IMAGE",
            Mode::Unknown => "UNKNOWN",
        }
    }

    /// Resolve an ADIF MODE/SUBMODE pair
    ///
    /// The mode field is tried as a major mode and then as a bare submode
    /// (some exports put `USB` or `FT4` straight into MODE). SUBMODE is used
    /// only when it belongs to that mode (or to the LoTW group it names), or
    /// when MODE itself is unrecognized. Returns `Unknown` when nothing
    /// matches.
    pub fn from_adif(mode: &str, submode: Option<&str>) -> Mode {
        let major = mode.parse::<Mode>().ok();
        match (major, submode.and_then(lookup_submode)) {
            (Some(major), Some(sub))
                if sub == major || (major.is_group() && sub.group() == major.group()) =>
            {
                sub
            }
            (Some(major), _) => major,
            (None, Some(sub)) => sub,
            (None, None) => Mode::Unknown,
        }
    }

    /// Family this mode belongs to, `None` for `Unknown`
    pub fn group(&self) -> Option<ModeGroup> {
        match self {
            Mode::Cw => Some(ModeGroup::Cw),
            Mode::Ssb | Mode::Am | Mode::Fm | Mode::DigitalVoice | Mode::Phone => {
                Some(ModeGroup::Phone)
            }
            Mode::Sstv | Mode::Fax | Mode::Image => Some(ModeGroup::Image),
            Mode::Rtty
            | Mode::Psk
            | Mode::Mfsk
            | Mode::Ft8
            | Mode::Jt65
            | Mode::Jt9
            | Mode::Olivia
            | Mode::Contesti
            | Mode::Hell
            | Mode::Data => Some(ModeGroup::Data),
            Mode::Unknown => None,
        }
    }

    /// True for the LoTW group pseudo-modes (PHONE, DATA, IMAGE)
    pub fn is_group(&self) -> bool {
        matches!(self, Mode::Phone | Mode::Data | Mode::Image)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Mode::Unknown)
    }
}

fn lookup_submode(value: &str) -> Option<Mode> {
    let needle = value.trim().to_ascii_uppercase();
    SUBMODES
        .iter()
        .find(|(name, _)| *name == needle)
        .map(|(_, mode)| *mode)
}

impl FromStr for Mode {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_uppercase();
        MAJOR_MODES
            .iter()
            .find(|(name, _)| *name == needle)
            .map(|(_, mode)| *mode)
            .or_else(|| lookup_submode(&needle))
            .ok_or_else(|| crate::Error::InvalidInput(format!("unrecognized mode '{}'", s)))
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
