//! Semantic version strings for knowledge records.
//!
//! Records carry a `major.minor.patch` version that is bumped on every
//! update. Unparseable or missing prior versions re-initialize to the
//! starting version rather than failing the write.

/// The version assigned to newly created records.
pub const INITIAL_VERSION: &str = "1.0.0";

/// Which component to bump on update. Defaults to `Patch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bump {
    Major,
    Minor,
    #[default]
    Patch,
}

impl Bump {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Patch => "patch",
        }
    }
}

impl std::fmt::Display for Bump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Bump {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "major" => Ok(Self::Major),
            "minor" => Ok(Self::Minor),
            "patch" => Ok(Self::Patch),
            _ => Err(format!("unknown version bump: {s}")),
        }
    }
}

/// Parse a `major.minor.patch` string. Extra whitespace is tolerated,
/// anything else is not.
fn parse(version: &str) -> Option<(u64, u64, u64)> {
    let mut parts = version.trim().splitn(3, '.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = parts.next()?.parse().ok()?;
    Some((major, minor, patch))
}

/// Bump `prior` by one unit at the requested level.
///
/// A missing or unparseable prior version re-initializes to
/// [`INITIAL_VERSION`] — old data never blocks an update.
pub fn increment(prior: &str, bump: Bump) -> String {
    let Some((major, minor, patch)) = parse(prior) else {
        return INITIAL_VERSION.to_string();
    };
    match bump {
        Bump::Major => format!("{}.0.0", major + 1),
        Bump::Minor => format!("{major}.{}.0", minor + 1),
        Bump::Patch => format!("{major}.{minor}.{}", patch + 1),
    }
}
