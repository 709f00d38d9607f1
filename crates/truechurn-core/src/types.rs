use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Contribution and churn totals for one author.
///
/// Both fields are line magnitudes. Results combine with `+`, which is
/// associative and commutative, so partial sums from independent units can be
/// merged in any order.
///
/// # Examples
///
/// ```
/// use truechurn_core::ChurnResult;
///
/// let a = ChurnResult::new(10, 2);
/// let b = ChurnResult::new(5, 1);
/// assert_eq!(a + b, ChurnResult::new(15, 3));
/// assert!(ChurnResult::default().is_zero());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChurnResult {
    /// Change mass on line addresses touched for the first time.
    pub contribution: u64,
    /// Change mass on line addresses touched again within the window.
    pub churn: u64,
}

impl ChurnResult {
    /// Create a result from its two components.
    pub fn new(contribution: u64, churn: u64) -> Self {
        Self {
            contribution,
            churn,
        }
    }

    /// `true` when there is no evidence of activity at all.
    pub fn is_zero(&self) -> bool {
        self.contribution == 0 && self.churn == 0
    }
}

impl Add for ChurnResult {
    type Output = ChurnResult;

    fn add(self, rhs: ChurnResult) -> ChurnResult {
        ChurnResult {
            contribution: self.contribution + rhs.contribution,
            churn: self.churn + rhs.churn,
        }
    }
}

impl AddAssign for ChurnResult {
    fn add_assign(&mut self, rhs: ChurnResult) {
        self.contribution += rhs.contribution;
        self.churn += rhs.churn;
    }
}

impl Sum for ChurnResult {
    fn sum<I: Iterator<Item = ChurnResult>>(iter: I) -> Self {
        iter.fold(ChurnResult::default(), Add::add)
    }
}

impl fmt::Display for ChurnResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "contribution={} churn={}",
            self.contribution, self.churn
        )
    }
}

/// Output format for command results.
///
/// # Examples
///
/// ```
/// use truechurn_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable table.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
