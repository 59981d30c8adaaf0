/// Session navigation history: an ordered list of normalized URLs plus a
/// cursor. `None` means nothing has been visited yet. Navigating while the
/// cursor is not at the end drops every entry after it before appending,
/// the usual browser back/forward semantics.
#[derive(Debug, Default)]
pub struct History {
    entries: Vec<String>,
    current: Option<usize>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, url: String) {
        if let Some(current) = self.current {
            self.entries.truncate(current + 1);
        }
        self.entries.push(url);
        self.current = Some(self.entries.len() - 1);
    }

    pub fn can_go_back(&self) -> bool {
        self.current.is_some_and(|i| i > 0)
    }

    pub fn can_go_forward(&self) -> bool {
        self.current.is_some_and(|i| i + 1 < self.entries.len())
    }

    pub fn go_back(&mut self) -> Option<&str> {
        if !self.can_go_back() {
            return None;
        }
        let current = self.current.as_mut()?;
        *current -= 1;
        self.entries.get(*current).map(String::as_str)
    }

    pub fn go_forward(&mut self) -> Option<&str> {
        if !self.can_go_forward() {
            return None;
        }
        let current = self.current.as_mut()?;
        *current += 1;
        self.entries.get(*current).map(String::as_str)
    }

    pub fn current(&self) -> Option<&str> {
        self.current
            .and_then(|i| self.entries.get(i))
            .map(String::as_str)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visit(history: &mut History, urls: &[&str]) {
        for url in urls {
            history.push((*url).to_string());
        }
    }

    #[test]
    fn push_appends_and_tracks_cursor() {
        let mut history = History::new();
        assert_eq!(history.current(), None);
        assert_eq!(history.current_index(), None);

        visit(&mut history, &["https://a.com", "https://b.com", "https://c.com"]);

        assert_eq!(
            history.entries(),
            &["https://a.com", "https://b.com", "https://c.com"]
        );
        assert_eq!(history.current_index(), Some(2));
        assert_eq!(history.current(), Some("https://c.com"));
    }

    #[test]
    fn push_after_going_back_truncates_forward_entries() {
        let mut history = History::new();
        visit(&mut history, &["https://a.com", "https://b.com", "https://c.com"]);

        assert_eq!(history.go_back(), Some("https://b.com"));
        assert_eq!(history.go_back(), Some("https://a.com"));
        history.push("https://d.com".to_string());

        assert_eq!(history.entries(), &["https://a.com", "https://d.com"]);
        assert_eq!(history.current_index(), Some(1));
    }

    #[test]
    fn back_and_forward_stop_at_bounds() {
        let mut history = History::new();
        visit(&mut history, &["https://a.com", "https://b.com"]);

        assert_eq!(history.go_forward(), None);
        assert_eq!(history.go_back(), Some("https://a.com"));
        assert_eq!(history.go_back(), None);
        assert_eq!(history.current_index(), Some(0));
        assert_eq!(history.go_forward(), Some("https://b.com"));
        assert_eq!(history.go_forward(), None);
        assert_eq!(history.current_index(), Some(1));
    }

    #[test]
    fn back_on_empty_history_is_a_noop() {
        let mut history = History::new();
        assert_eq!(history.go_back(), None);
        assert_eq!(history.go_forward(), None);
        assert!(!history.can_go_back());
        assert!(!history.can_go_forward());
    }
}
