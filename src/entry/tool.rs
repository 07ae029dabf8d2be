/// Which way a metric moves when performance improves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    BiggerIsBetter,
    SmallerIsBetter,
}

impl Direction {
    /// True when `current` is strictly better than `previous`.
    pub fn is_improvement(self, previous: f64, current: f64) -> bool {
        match self {
            Self::BiggerIsBetter => current > previous,
            Self::SmallerIsBetter => current < previous,
        }
    }
}

/// Harness tags that report throughput-like metrics.
const BIGGER_IS_BETTER: &[&str] = &["customBiggerIsBetter", "benchmarkjs", "pytest"];

/// Harness tags that report time-like metrics.
const SMALLER_IS_BETTER: &[&str] = &[
    "customSmallerIsBetter",
    "cargo",
    "go",
    "benchmarkluau",
    "googlecpp",
    "catch2",
    "julia",
    "jmh",
    "benchmarkdotnet",
];

/// Map a `tool` tag to its direction. Unknown tags are legal but have none.
pub fn direction_of(tool: &str) -> Option<Direction> {
    if BIGGER_IS_BETTER.contains(&tool) {
        Some(Direction::BiggerIsBetter)
    } else if SMALLER_IS_BETTER.contains(&tool) {
        Some(Direction::SmallerIsBetter)
    } else {
        None
    }
}
