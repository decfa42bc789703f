//! Go-to-definition adapter: cursor position in, LSP location out.

use std::path::PathBuf;

use jenkinsdoc_core::{DefinitionFile, DefinitionMiss, JenkinsDoc, SearchScope};
use tower_lsp::lsp_types::{GotoDefinitionResponse, Location, Position, Range, Url};

use crate::position::{line_start, position_to_byte};

/// Resolve the identifier under the cursor.
///
/// `None` means there was nothing to navigate from; `Some(Err(_))` carries
/// the message to show the user.
pub fn definition_for_document(
    engine: &JenkinsDoc,
    uri: &Url,
    content: &str,
    position: Position,
    roots: &[PathBuf],
) -> Option<Result<GotoDefinitionResponse, DefinitionMiss>> {
    let offset = position_to_byte(content, position);
    let target = engine.definition_target_at(content, offset)?;
    let scope = SearchScope {
        current_text: Some(content),
        roots,
    };

    let found = match engine.definition(&target, &scope) {
        Ok(found) => found,
        Err(miss) => {
            tracing::debug!(%target, %miss, "definition not found");
            return Some(Err(miss));
        }
    };

    let target_uri = match &found.file {
        DefinitionFile::Current => uri.clone(),
        DefinitionFile::Path(path) => match Url::from_file_path(path) {
            Ok(url) => url,
            Err(()) => {
                tracing::warn!(path = %path.display(), "definition path is not a valid file URI");
                return None;
            }
        },
    };
    let start = line_start(found.line);
    Some(Ok(GotoDefinitionResponse::Scalar(Location {
        uri: target_uri,
        range: Range { start, end: start },
    })))
}
