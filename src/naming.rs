use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path};
use time::{
    OffsetDateTime, PrimitiveDateTime, UtcOffset, format_description::BorrowedFormatItem,
    macros::format_description,
};

const JOB_ID_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year][month][day][hour][minute][second]");
const DISPLAY_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[month]월 [day]일 [hour]시 [minute]분 결과");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Desktop,
    Mobile,
}

impl Profile {
    /// Audit order within one URL.
    pub const ALL: [Profile; 2] = [Profile::Desktop, Profile::Mobile];

    pub fn as_str(self) -> &'static str {
        match self {
            Profile::Desktop => "desktop",
            Profile::Mobile => "mobile",
        }
    }

    /// Lighthouse config file for this profile, relative to the profiles dir.
    pub fn config_file(self) -> String {
        format!("{}.json", self.as_str())
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Accepts an externally supplied id only if it names a single directory entry.
    pub fn parse(raw: &str) -> Option<Self> {
        is_safe_segment(raw).then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<Path> for JobId {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

pub fn job_id(now: OffsetDateTime) -> JobId {
    // The format only holds numeric components, so formatting cannot fail for valid dates.
    let raw = now
        .format(JOB_ID_FORMAT)
        .unwrap_or_else(|_| now.unix_timestamp().to_string());
    JobId(raw)
}

pub fn report_filename(url: &str, profile: Profile) -> String {
    let clean = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .unwrap_or(url);
    let name = clean.replace(['/', '?'], "_");
    format!("{name}_{profile}.html")
}

/// Human-readable form used by the listing page. Ids that are not timestamps
/// are shown as-is.
pub fn display_job_id(id: &JobId) -> String {
    PrimitiveDateTime::parse(id.as_str(), JOB_ID_FORMAT)
        .ok()
        .and_then(|dt| dt.format(DISPLAY_FORMAT).ok())
        .unwrap_or_else(|| id.to_string())
}

/// True when `s` is exactly one normal path component. On windows `\` is a
/// separator and fails the component check; on unix it is an ordinary byte.
pub fn is_safe_segment(s: &str) -> bool {
    if s.is_empty() || s.contains('\0') || s.contains('/') {
        return false;
    }
    let mut components = Path::new(s).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(c)), None) if c == s
    )
}

/// Wall clock pinned to the UTC offset observed at startup.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    offset: UtcOffset,
    fell_back: bool,
}

impl Clock {
    pub fn utc() -> Self {
        Self {
            offset: UtcOffset::UTC,
            fell_back: false,
        }
    }

    pub fn fixed(offset: UtcOffset) -> Self {
        Self {
            offset,
            fell_back: false,
        }
    }

    /// Must run before the process spawns threads; the local offset is
    /// unavailable afterwards on most unix targets.
    pub fn detect(use_utc: bool) -> Self {
        if use_utc {
            return Self::utc();
        }
        match UtcOffset::current_local_offset() {
            Ok(offset) => Self::fixed(offset),
            Err(_) => Self {
                offset: UtcOffset::UTC,
                fell_back: true,
            },
        }
    }

    /// Whether local offset detection failed and UTC is used instead.
    pub fn fell_back(&self) -> bool {
        self.fell_back
    }

    pub fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.offset)
    }
}
