use crate::config::{LayoutSettings, NodeStyle};
use crate::error::FamilyResult;
use crate::layout::model::{NodeRef, PairKey, TreeLayout};
use crate::types::PersonId;
use std::collections::HashMap;
use std::str::FromStr;

/// Trait for layout formatters
pub trait LayoutFormatter {
    fn format(&self, layout: &TreeLayout) -> FamilyResult<String>;

    /// File extension of the produced text
    fn extension(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Dot,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "dot" | "gv" => Ok(OutputFormat::Dot),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("Unsupported format: {}", other)),
        }
    }
}

/// Graph description for an external DOT renderer
#[derive(Debug, Clone)]
pub struct DotFormatter {
    graph_name: String,
    spacer: usize,
    node_style: NodeStyle,
}

impl DotFormatter {
    pub fn new(settings: &LayoutSettings) -> Self {
        Self {
            graph_name: settings.graph_name.clone(),
            spacer: settings.spacer,
            node_style: settings.node_style.clone(),
        }
    }

    fn write_preamble(&self, out: &mut DotWriter) {
        out.open(&format!("digraph {} {{", dot_id(&self.graph_name)));
        out.line("edge [dir=none];");
        out.line("node [shape=box];");
        out.line("splines=false;");
        out.line("newrank=true;");
        out.line("ratio=\"compress\";");
    }

    fn write_people(&self, layout: &TreeLayout, out: &mut DotWriter) {
        let style = &self.node_style;
        out.line("# People featured in tree");
        out.line(&format!(
            "node[shape=box,fontname=\"{}\",fontsize={},color=\"{}\",width={},height={},style=filled]",
            style.fontname, style.fontsize, style.color, style.width, style.height
        ));

        for node in &layout.nodes {
            let id = node.id.to_string();
            let padding = " ".repeat(self.spacer.saturating_sub(id.len()));
            out.line(&format!(
                "\"P{}\"{} [ label=<{}>, gender=\"{}\", color=\"{}\" ]",
                id,
                padding,
                node.label,
                node.gender.display_name(),
                node.color
            ));
        }
    }

    fn write_relations(&self, layout: &TreeLayout, out: &mut DotWriter) {
        out.line("# Relations");
        out.line("node[label=\"\", width=0, height=0];");

        for group in &layout.rank_groups {
            if group.members.len() > 1 {
                let members: Vec<String> = group.members.iter().map(NodeRef::to_string).collect();
                out.line(&format!(
                    "{{ rank=same; {} }} # {}",
                    members.join("; "),
                    group.key.relation_id()
                ));
            }
        }

        self.write_clusters(layout, out);
    }

    /// Nested invisible clusters, walked with an explicit stack
    fn write_clusters(&self, layout: &TreeLayout, out: &mut DotWriter) {
        enum Step {
            Open(PersonId),
            Close,
        }

        let mut nested: HashMap<Option<PersonId>, Vec<PersonId>> = HashMap::new();
        for cluster in &layout.clusters {
            nested.entry(cluster.parent).or_default().push(cluster.owner);
        }

        let mut stack: Vec<Step> = nested
            .get(&None)
            .map(|owners| owners.iter().rev().map(|owner| Step::Open(*owner)).collect())
            .unwrap_or_default();

        while let Some(step) = stack.pop() {
            match step {
                Step::Close => out.close(),
                Step::Open(owner) => {
                    out.open(&format!("subgraph cluster_{} {{", owner));
                    out.line("style=\"invis\";");
                    for edge in layout.edges_in(owner) {
                        out.line(&format!("{} -> {};", edge.from, edge.to));
                    }
                    stack.push(Step::Close);
                    if let Some(children) = nested.get(&Some(owner)) {
                        stack.extend(children.iter().rev().map(|child| Step::Open(*child)));
                    }
                }
            }
        }
    }

    fn write_comments(&self, layout: &TreeLayout, out: &mut DotWriter) {
        out.line("# Mountpoints");
        for mountpoint in &layout.mountpoints {
            let node = NodeRef::from(mountpoint.key);
            let note = match (mountpoint.key, mountpoint.shared_children) {
                (PairKey::Couple(..), true) => " (shared children)",
                _ => "",
            };
            out.line(&format!("# {}: {}{}", mountpoint.key.relation_id(), node, note));
        }

        if !layout.warnings.is_empty() {
            out.line("# Warnings");
            for warning in &layout.warnings {
                out.line(&format!("# {}", warning));
            }
        }
    }
}

impl LayoutFormatter for DotFormatter {
    fn format(&self, layout: &TreeLayout) -> FamilyResult<String> {
        let mut out = DotWriter::default();
        self.write_preamble(&mut out);
        self.write_people(layout, &mut out);
        self.write_relations(layout, &mut out);
        self.write_comments(layout, &mut out);
        out.close();
        Ok(out.finish())
    }

    fn extension(&self) -> &'static str {
        "dot"
    }
}

/// JSON formatter
pub struct JsonFormatter;

impl LayoutFormatter for JsonFormatter {
    fn format(&self, layout: &TreeLayout) -> FamilyResult<String> {
        Ok(serde_json::to_string_pretty(layout)?)
    }

    fn extension(&self) -> &'static str {
        "json"
    }
}

/// Turns a finished layout into text for the external renderer
#[derive(Debug, Clone)]
pub struct LayoutSerializer {
    dot: DotFormatter,
}

impl LayoutSerializer {
    pub fn new(settings: &LayoutSettings) -> Self {
        Self {
            dot: DotFormatter::new(settings),
        }
    }

    /// Serialize the layout in the specified format
    pub fn serialize(&self, layout: &TreeLayout, format: OutputFormat) -> FamilyResult<String> {
        self.formatter(format).format(layout)
    }

    /// "<root id>.<extension>", the name the rendered tree is stored under
    pub fn render_file_name(&self, root: PersonId, format: OutputFormat) -> String {
        format!("{}.{}", root, self.formatter(format).extension())
    }

    fn formatter(&self, format: OutputFormat) -> &dyn LayoutFormatter {
        match format {
            OutputFormat::Dot => &self.dot,
            OutputFormat::Json => &JsonFormatter,
        }
    }
}

/// Plain identifiers pass through, anything else is quoted
fn dot_id(name: &str) -> String {
    let plain = name.chars().next().is_some_and(|c| !c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        return name.to_string();
    }
    format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Line buffer that indents by two spaces per open brace
#[derive(Debug, Default)]
struct DotWriter {
    lines: Vec<String>,
    indent: usize,
}

impl DotWriter {
    fn line(&mut self, text: &str) {
        self.lines.push(format!("{}{}", " ".repeat(self.indent), text));
    }

    fn open(&mut self, text: &str) {
        self.line(text);
        self.indent += 2;
    }

    fn close(&mut self) {
        self.indent = self.indent.saturating_sub(2);
        self.line("}");
    }

    fn finish(self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}
