pub const MAX_LABEL_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Bookmark,
    Highlight,
}

impl MarkerKind {
    pub fn icon(self) -> &'static str {
        match self {
            MarkerKind::Bookmark => "📖",
            MarkerKind::Highlight => "🖍",
        }
    }
}

/// A bookmark or highlight pointing into the current page's note text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub kind: MarkerKind,
    pub label: String,
    /// Character offset into the note text
    pub anchor: usize,
}

impl Marker {
    /// Create a marker, shortening long labels to `MAX_LABEL_CHARS` plus `...`
    pub fn new(kind: MarkerKind, label: &str, anchor: usize) -> Self {
        let label = if label.chars().count() > MAX_LABEL_CHARS {
            let mut short: String = label.chars().take(MAX_LABEL_CHARS).collect();
            short.push_str("...");
            short
        } else {
            label.to_string()
        };
        Self { kind, label, anchor }
    }
}

/// Markers of the page currently on screen. Cleared on every page change.
#[derive(Debug, Clone, Default)]
pub struct PageMarkers {
    markers: Vec<Marker>,
}

impl PageMarkers {
    /// Add a marker; blank labels are ignored. Returns whether one was added.
    pub fn add(&mut self, kind: MarkerKind, label: &str, anchor: usize) -> bool {
        if label.trim().is_empty() {
            return false;
        }
        self.markers.push(Marker::new(kind, label, anchor));
        true
    }

    pub fn of_kind(&self, kind: MarkerKind) -> impl Iterator<Item = &Marker> {
        self.markers.iter().filter(move |m| m.kind == kind)
    }

    pub fn all(&self) -> &[Marker] {
        &self.markers
    }

    pub fn get(&self, index: usize) -> Option<&Marker> {
        self.markers.get(index)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn clear(&mut self) {
        self.markers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_labels_are_shortened() {
        let text = "x".repeat(80);
        let marker = Marker::new(MarkerKind::Bookmark, &text, 0);
        assert_eq!(marker.label.chars().count(), MAX_LABEL_CHARS + 3);
        assert!(marker.label.ends_with("..."));
    }

    #[test]
    fn test_short_labels_are_kept() {
        let marker = Marker::new(MarkerKind::Highlight, "ownership rules", 12);
        assert_eq!(marker.label, "ownership rules");
        assert_eq!(marker.anchor, 12);
    }

    #[test]
    fn test_blank_labels_are_ignored() {
        let mut markers = PageMarkers::default();
        assert!(!markers.add(MarkerKind::Bookmark, "   ", 0));
        assert!(markers.add(MarkerKind::Bookmark, "borrowck", 4));
        assert!(markers.add(MarkerKind::Highlight, "lifetimes", 9));
        assert_eq!(markers.len(), 2);
        assert_eq!(markers.of_kind(MarkerKind::Highlight).count(), 1);

        markers.clear();
        assert!(markers.is_empty());
    }
}
