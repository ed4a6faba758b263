use crate::domain::TARGET_VOCABULARIES;
use crate::error::ConvertError;
use crate::model::PathwayDocument;
use crate::tools::ExternalTool;

/// Annotates every entity's type list with identifiers from the target
/// vocabularies. The returned document replaces the input wholesale.
pub trait XrefResolver {
    fn resolve(
        &self,
        document: &PathwayDocument,
        organism: &str,
    ) -> Result<PathwayDocument, ConvertError>;
}

impl<T: XrefResolver + ?Sized> XrefResolver for &T {
    fn resolve(
        &self,
        document: &PathwayDocument,
        organism: &str,
    ) -> Result<PathwayDocument, ConvertError> {
        (**self).resolve(document, organism)
    }
}

pub struct BridgeDbResolver<'a> {
    tool: &'a dyn ExternalTool,
}

impl<'a> BridgeDbResolver<'a> {
    pub fn new(tool: &'a dyn ExternalTool) -> Self {
        Self { tool }
    }

    pub fn arguments(organism: &str) -> Vec<String> {
        let mut args = vec![
            "xrefs".to_string(),
            "-f".to_string(),
            "json".to_string(),
            "-i".to_string(),
            ".entitiesById[].type".to_string(),
            organism.to_string(),
            ".entitiesById[].xrefDataSource".to_string(),
            ".entitiesById[].xrefIdentifier".to_string(),
        ];
        for (vocabulary, property) in TARGET_VOCABULARIES {
            args.push(vocabulary.to_string());
            if let Some(property) = property {
                args.push(property.to_string());
            }
        }
        args
    }
}

impl XrefResolver for BridgeDbResolver<'_> {
    fn resolve(
        &self,
        document: &PathwayDocument,
        organism: &str,
    ) -> Result<PathwayDocument, ConvertError> {
        let input = document.to_vec()?;
        let output = self
            .tool
            .invoke(&input, &Self::arguments(organism))?
            .into_success(self.tool.name())?;
        PathwayDocument::from_slice(&output)
    }
}
