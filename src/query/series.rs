use serde::Serialize;

use crate::store::Snapshot;

/// One point of a bench's series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: i64,
    pub value: f64,
}

impl From<SeriesPoint> for (i64, f64) {
    fn from(p: SeriesPoint) -> Self {
        (p.date, p.value)
    }
}

/// The values of one bench name across a group's log.
///
/// Holds a snapshot of the log, so later appends do not show up in it.
/// Points are produced lazily on each iteration.
#[derive(Debug, Clone)]
pub struct Series {
    log: Snapshot,
    bench: String,
}

impl Series {
    pub(crate) fn new(log: Snapshot, bench: &str) -> Self {
        Self {
            log,
            bench: bench.to_string(),
        }
    }

    pub fn bench(&self) -> &str {
        &self.bench
    }

    pub fn iter(&self) -> SeriesIter<'_> {
        SeriesIter {
            series: self,
            next: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = SeriesPoint;
    type IntoIter = SeriesIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct SeriesIter<'a> {
    series: &'a Series,
    next: usize,
}

impl Iterator for SeriesIter<'_> {
    type Item = SeriesPoint;

    fn next(&mut self) -> Option<Self::Item> {
        let log = &self.series.log;
        while let Some(entry) = log.get(self.next) {
            self.next += 1;
            if let Some(bench) = entry.bench(&self.series.bench) {
                return Some(SeriesPoint {
                    date: entry.date,
                    value: bench.value(),
                });
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.series.log.len().saturating_sub(self.next)))
    }
}

impl std::iter::FusedIterator for SeriesIter<'_> {}
