//! Rendition selection by label priority

use crate::config::DEFAULT_RENDITION_PRIORITY;
use crate::types::Rendition;

/// Picks the best available rendition from a size catalog
///
/// The first label of the priority list that appears in the catalog wins,
/// regardless of where it appears in the catalog.
#[derive(Clone, Debug)]
pub struct RenditionResolver {
    priority: Vec<String>,
}

impl RenditionResolver {
    /// Resolver with a custom priority order (most preferred first)
    pub fn new(priority: Vec<String>) -> Self {
        Self { priority }
    }

    /// Labels in priority order
    pub fn priority(&self) -> &[String] {
        &self.priority
    }

    /// Best rendition in `catalog`, None if no prioritised label is present
    ///
    /// # Examples
    ///
    /// ```
    /// use flickr_archive::rendition::RenditionResolver;
    /// use flickr_archive::types::Rendition;
    ///
    /// let catalog = vec![
    ///     Rendition { label: "Medium".into(), source: "https://x/m.jpg".into(), width: None, height: None },
    ///     Rendition { label: "Large".into(), source: "https://x/l.jpg".into(), width: None, height: None },
    /// ];
    ///
    /// let best = RenditionResolver::default().resolve(&catalog).unwrap();
    /// assert_eq!(best.label, "Large");
    /// ```
    pub fn resolve<'a>(&self, catalog: &'a [Rendition]) -> Option<&'a Rendition> {
        self.priority
            .iter()
            .find_map(|label| catalog.iter().find(|r| &r.label == label))
    }
}

impl Default for RenditionResolver {
    fn default() -> Self {
        Self::new(
            DEFAULT_RENDITION_PRIORITY
                .iter()
                .map(|label| label.to_string())
                .collect(),
        )
    }
}
