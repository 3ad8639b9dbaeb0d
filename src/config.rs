/// Configuration management for the family tree generator
use crate::types::Gender;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    #[serde(default)]
    pub layout: LayoutSettings,
    #[serde(default)]
    pub classification: ClassificationSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    pub graph_name: String,
    /// Column width used to align person ids in the graph source
    pub spacer: usize,
    /// Stop populating the tree after this many people
    pub max_nodes: Option<usize>,
    pub colours: GenderColours,
    pub node_style: NodeStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenderColours {
    pub male: String,
    pub female: String,
    pub unknown: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeStyle {
    pub fontname: String,
    pub fontsize: u32,
    pub color: String,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationSettings {
    /// Family surnames relatives are tagged with
    pub families: Vec<String>,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            graph_name: "G".to_string(),
            spacer: 8,
            max_nodes: None,
            colours: GenderColours::default(),
            node_style: NodeStyle::default(),
        }
    }
}

impl Default for GenderColours {
    fn default() -> Self {
        Self {
            male: "lightblue".to_string(),
            female: "pink".to_string(),
            unknown: "lightgrey".to_string(),
        }
    }
}

impl Default for NodeStyle {
    fn default() -> Self {
        Self {
            fontname: "sans-serif".to_string(),
            fontsize: 8,
            color: "black".to_string(),
            width: 1.0,
            height: 0.5,
        }
    }
}

impl GenderColours {
    pub fn colour_for(&self, gender: Gender) -> &str {
        match gender {
            Gender::Male => &self.male,
            Gender::Female => &self.female,
            Gender::Unknown => &self.unknown,
        }
    }
}

impl TreeConfig {
    /// Load configuration from file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: TreeConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Self> {
        let mut config = TreeConfig::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Override settings with environment variables if present
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(max_nodes) = lookup("FMLY_TREE_MAX_NODES") {
            self.layout.max_nodes = Some(max_nodes.parse()?);
        }

        if let Some(spacer) = lookup("FMLY_TREE_SPACER") {
            self.layout.spacer = spacer.parse()?;
        }

        if let Some(families) = lookup("FMLY_TREE_FAMILIES") {
            self.classification.families = parse_families(&families);
        }

        Ok(())
    }

    /// Merge with another configuration (other takes precedence)
    pub fn merge_with(&mut self, other: TreeConfig) {
        let defaults = LayoutSettings::default();

        if other.layout.graph_name != defaults.graph_name {
            self.layout.graph_name = other.layout.graph_name;
        }
        if other.layout.spacer != defaults.spacer {
            self.layout.spacer = other.layout.spacer;
        }
        if other.layout.max_nodes.is_some() {
            self.layout.max_nodes = other.layout.max_nodes;
        }
        if other.layout.colours != defaults.colours {
            self.layout.colours = other.layout.colours;
        }
        if other.layout.node_style != defaults.node_style {
            self.layout.node_style = other.layout.node_style;
        }

        if !other.classification.families.is_empty() {
            self.classification.families = other.classification.families;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let name = &self.layout.graph_name;
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(anyhow::anyhow!(
                "Graph name must be a non-empty identifier of letters, digits and underscores"
            ));
        }

        if self.layout.max_nodes == Some(0) {
            return Err(anyhow::anyhow!("Node limit must be greater than 0"));
        }

        let colours = &self.layout.colours;
        if [&colours.male, &colours.female, &colours.unknown]
            .iter()
            .any(|colour| colour.is_empty() || colour.contains('"'))
        {
            return Err(anyhow::anyhow!("Gender colours must be non-empty and unquoted"));
        }

        let style = &self.layout.node_style;
        if style.fontsize == 0 {
            return Err(anyhow::anyhow!("Font size must be greater than 0"));
        }
        if style.width < 0.0 || style.height < 0.0 {
            return Err(anyhow::anyhow!("Node width and height must be non-negative"));
        }

        if self
            .classification
            .families
            .iter()
            .any(|family| family.trim().is_empty())
        {
            return Err(anyhow::anyhow!("Family surnames must not be empty"));
        }

        Ok(())
    }
}

fn parse_families(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|family| !family.is_empty())
        .map(str::to_string)
        .collect()
}
