//! Outline parsing: tab-indented `- ` bullets into an owned forest, and back to text.
//!
//! Lines that are not bullets (blank lines, prose, property drawers) are skipped
//! without closing any open bullet, so a paragraph between two children does not
//! detach the second child from its parent.

/// One bullet line and everything nested beneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulletNode {
    /// Number of leading tabs on the source line.
    pub level: usize,
    /// Text after the `- ` marker.
    pub text: String,
    pub children: Vec<BulletNode>,
    /// 0-based line number in the parsed content.
    pub line: usize,
}

impl BulletNode {
    pub fn new(level: usize, text: impl Into<String>, line: usize) -> Self {
        Self {
            level,
            text: text.into(),
            children: Vec::new(),
            line,
        }
    }

    pub fn with_children(mut self, children: Vec<BulletNode>) -> Self {
        self.children = children;
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Match `<tabs>-<whitespace><text>` and return the tab count and the text.
///
/// The text must be non-empty; `"- "` alone is not a bullet. Indentation with
/// spaces is not recognised.
pub fn parse_bullet_line(line: &str) -> Option<(usize, &str)> {
    let level = line.bytes().take_while(|b| *b == b'\t').count();
    let rest = line[level..].strip_prefix('-')?;
    let mut chars = rest.chars();
    if !chars.next()?.is_whitespace() {
        return None;
    }
    let text = chars.as_str();
    (!text.is_empty()).then_some((level, text))
}

/// Parse content into a forest of bullets in document order.
///
/// A bullet becomes a child of the nearest preceding open bullet with a smaller
/// level. Level jumps of more than one are accepted and attach to the deepest
/// open bullet.
pub fn parse_outline(content: &str) -> Vec<BulletNode> {
    let mut roots = Vec::new();
    // Open ancestors, shallowest first. An empty stack stands for the root list.
    let mut open: Vec<BulletNode> = Vec::new();

    for (line_no, line) in content.lines().enumerate() {
        let Some((level, text)) = parse_bullet_line(line) else {
            continue;
        };
        close_open(&mut open, &mut roots, level);
        open.push(BulletNode::new(level, text, line_no));
    }
    close_open(&mut open, &mut roots, 0);

    roots
}

/// Pop every open bullet with `level >= min_level`, attaching each to the bullet
/// below it on the stack (or to the roots).
fn close_open(open: &mut Vec<BulletNode>, roots: &mut Vec<BulletNode>, min_level: usize) {
    while open.last().is_some_and(|node| node.level >= min_level) {
        let Some(node) = open.pop() else {
            break;
        };
        match open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => roots.push(node),
        }
    }
}

/// Render bullets back to outline text, one `"<tabs>- <text>"` line per node.
///
/// Indentation is the node's depth below the rendered roots, so a subtree taken
/// from the middle of a document renders flush left.
pub fn render_outline(nodes: &[BulletNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(node, 0, &mut out);
    }
    out
}

/// Render a single bullet and its subtree.
pub fn render_subtree(node: &BulletNode) -> String {
    render_outline(std::slice::from_ref(node))
}

fn write_node(node: &BulletNode, depth: usize, out: &mut String) {
    if !out.is_empty() {
        out.push('\n');
    }
    out.extend(std::iter::repeat_n('\t', depth));
    out.push_str("- ");
    out.push_str(&node.text);
    for child in &node.children {
        write_node(child, depth + 1, out);
    }
}
