// Navigation model: the portal is browsed like a tiny filesystem.
// The course list is the root, each course home is a directory with the
// "Grades" and "Content" entries, and those two are leaves. A stack of
// `Location` frames records the way down so `cd ..` can walk back up
// without re-listing anything.

/// Which portal page a `Location` frame represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Root,
    CourseHome,
    Grades,
    Content,
}

/// A navigable entry visible at some location. Course tiles and the
/// Grades/Content links carry an href; content entries are acted on in
/// place and carry none.
#[derive(Debug, Clone)]
pub struct ChildItem {
    pub name: String,
    pub link: Option<String>,
}

/// One frame of the navigation history: the page URL plus the children
/// that were listed there.
#[derive(Debug, Clone)]
pub struct Location {
    pub url: String,
    pub kind: ViewKind,
    pub children: Vec<ChildItem>,
}

/// Stack of visited locations. The URL and its child list live in the
/// same frame, so the page history and the per-level listings can never
/// drift out of step.
#[derive(Debug, Default)]
pub struct NavStack {
    frames: Vec<Location>,
}

impl NavStack {
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn current(&self) -> Option<&Location> {
        self.frames.last()
    }

    /// The kind of page currently shown, if anything has been entered yet.
    pub fn view(&self) -> Option<ViewKind> {
        self.current().map(|loc| loc.kind)
    }

    pub fn child_names(&self) -> Vec<String> {
        self.current()
            .map(|loc| loc.children.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Look up a child of the current location by its display name.
    pub fn resolve(&self, name: &str) -> Option<&ChildItem> {
        self.current()?.children.iter().find(|c| c.name == name)
    }

    /// Push a newly listed location; it becomes the current one.
    pub fn enter(&mut self, location: Location) {
        self.frames.push(location);
    }

    /// Pop one level and return the restored location. Returns `None` at
    /// the root (and on an empty stack), leaving the stack untouched.
    pub fn up(&mut self) -> Option<&Location> {
        if self.frames.len() <= 1 {
            return None;
        }
        self.frames.pop();
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str) -> ChildItem {
        ChildItem {
            name: name.to_string(),
            link: Some(format!("https://example.com/{}", name)),
        }
    }

    fn location(url: &str, kind: ViewKind, names: &[&str]) -> Location {
        Location {
            url: url.to_string(),
            kind,
            children: names.iter().map(|n| item(n)).collect(),
        }
    }

    #[test]
    fn balanced_moves_restore_depth_and_listing() {
        let mut nav = NavStack::new();
        nav.enter(location("root", ViewKind::Root, &["CS 241", "MATH 239"]));
        nav.enter(location("cs241", ViewKind::CourseHome, &["Grades", "Content"]));
        nav.enter(location("cs241/content", ViewKind::Content, &["Lecture 1 Notes"]));
        assert_eq!(nav.depth(), 3);

        let restored = nav.up().unwrap();
        assert_eq!(restored.url, "cs241");
        assert_eq!(nav.child_names(), vec!["Grades", "Content"]);

        let restored = nav.up().unwrap();
        assert_eq!(restored.url, "root");
        assert_eq!(nav.depth(), 1);
        assert_eq!(nav.child_names(), vec!["CS 241", "MATH 239"]);
    }

    #[test]
    fn up_at_root_is_refused_and_does_not_mutate() {
        let mut nav = NavStack::new();
        nav.enter(location("root", ViewKind::Root, &["CS 241"]));
        assert!(nav.up().is_none());
        assert_eq!(nav.depth(), 1);
        assert_eq!(nav.child_names(), vec!["CS 241"]);
    }

    #[test]
    fn up_on_empty_stack_is_refused() {
        let mut nav = NavStack::new();
        assert!(nav.up().is_none());
        assert_eq!(nav.depth(), 0);
    }

    #[test]
    fn resolve_unknown_child_is_none() {
        let mut nav = NavStack::new();
        nav.enter(location("root", ViewKind::Root, &["CS 241"]));
        assert!(nav.resolve("PHYS 121").is_none());
        assert_eq!(nav.depth(), 1);
    }

    #[test]
    fn resolve_returns_the_link() {
        let mut nav = NavStack::new();
        nav.enter(location("root", ViewKind::Root, &["CS 241"]));
        let child = nav.resolve("CS 241").unwrap();
        assert_eq!(child.link.as_deref(), Some("https://example.com/CS 241"));
    }

    #[test]
    fn view_follows_the_top_frame() {
        let mut nav = NavStack::new();
        assert_eq!(nav.view(), None);
        nav.enter(location("root", ViewKind::Root, &[]));
        nav.enter(location("c", ViewKind::CourseHome, &[]));
        nav.enter(location("c/content", ViewKind::Content, &[]));
        assert_eq!(nav.view(), Some(ViewKind::Content));
        nav.up();
        assert_eq!(nav.view(), Some(ViewKind::CourseHome));
    }
}
