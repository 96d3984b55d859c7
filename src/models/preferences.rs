/// Cap used by most call sites
pub const DEFAULT_PREFERENCE_CAP: usize = 10;
/// Cap used by the extended profile view
pub const EXTENDED_PREFERENCE_CAP: usize = 15;

/// Ordered, unique, capped list of genre labels
///
/// Order is insertion order; the first occurrence of a label wins and anything past the cap
/// is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceList {
    labels: Vec<String>,
    cap: usize,
}

impl PreferenceList {
    /// Creates an empty list with the given cap
    pub fn new(cap: usize) -> Self {
        Self {
            labels: Vec::new(),
            cap,
        }
    }

    /// Builds a list from raw labels, deduplicating and truncating to the cap
    pub fn from_labels<I, S>(labels: I, cap: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = Self::new(cap);
        for label in labels {
            list.push(label);
        }
        list
    }

    /// Appends a label if it is new and there is room; returns whether it was added
    pub fn push(&mut self, label: impl Into<String>) -> bool {
        let label = label.into();
        if self.labels.len() >= self.cap || self.contains(&label) {
            return false;
        }
        self.labels.push(label);
        true
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.labels
    }
}
