use grass::{InputSyntax, Options, OutputStyle};

use crate::error::StageError;
use crate::fileset::FileSet;
use crate::transform::{Bundle, concat, locate_fault, read_text};

const SEPARATOR: &str = "\n";

/// Concatenate stylesheets in order and compress them into one bundle.
///
/// Only whitespace and comments go; selectors and properties are kept as
/// written.
pub fn bundle_css(name: &str, files: &FileSet) -> Result<Bundle, StageError> {
    let sources = read_text(name, files)?;
    let joined = concat(&sources, SEPARATOR);

    let content = minify_source(&joined).map_err(|reason| {
        locate_fault(name, &sources, reason, |text| minify_source(text).map(drop))
    })?;

    tracing::debug!(
        bundle = name,
        files = sources.len(),
        bytes = content.len(),
        "minified styles"
    );

    Ok(Bundle {
        name: name.to_string(),
        content: content.into_bytes(),
    })
}

/// Compress a single stylesheet.
pub fn minify_source(source: &str) -> Result<String, String> {
    let options = Options::default()
        .input_syntax(InputSyntax::Css)
        .style(OutputStyle::Compressed);

    grass::from_string(source, &options).map_err(|err| err.to_string())
}
