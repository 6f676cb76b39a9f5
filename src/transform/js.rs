use camino::Utf8Path;
use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_minifier::{MangleOptions, Minifier, MinifierOptions};
use oxc_parser::Parser;
use oxc_span::SourceType;

use crate::error::StageError;
use crate::fileset::FileSet;
use crate::output::Output;
use crate::transform::{Bundle, concat, copy, locate_fault, read_text};

/// An empty statement between sources, so a file that ends without a
/// semicolon can never run into the next one.
const SEPARATOR: &str = "\n;\n";

/// Knobs for the script stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsOptions {
    /// Copy every script through as-is instead of bundling.
    pub skip_minify: bool,
}

/// Build the script outputs for `files` under `dir`.
///
/// By default the files are concatenated in order and minified into a single
/// bundle named `name`. With [`JsOptions::skip_minify`] each file is copied
/// through individually, keeping its relative path.
pub fn scripts(
    files: &FileSet,
    name: &str,
    dir: impl AsRef<Utf8Path>,
    options: JsOptions,
) -> Result<Vec<Output>, StageError> {
    if options.skip_minify {
        return copy(files, dir);
    }

    Ok(vec![bundle_js(name, files)?.into_output(dir)])
}

/// Concatenate `files` in order and minify the result.
///
/// Top-level declarations are left alone because other scripts on the page
/// may refer to them; only names local to a function scope get shortened.
pub fn bundle_js(name: &str, files: &FileSet) -> Result<Bundle, StageError> {
    let sources = read_text(name, files)?;
    let joined = concat(&sources, SEPARATOR);

    let content = minify_source(&joined).map_err(|reason| {
        locate_fault(name, &sources, reason, |text| minify_source(text).map(drop))
    })?;

    tracing::debug!(
        bundle = name,
        files = sources.len(),
        bytes = content.len(),
        "minified scripts"
    );

    Ok(Bundle {
        name: name.to_string(),
        content,
    })
}

/// Minify a single classic (non-module) script.
///
/// Only whitespace and comments are dropped and local names mangled. No
/// compression pass runs, so statements, directives and literal values come
/// out as they went in and no newer syntax is introduced.
pub fn minify_source(source: &str) -> Result<Vec<u8>, String> {
    let allocator = Allocator::default();
    let source_type = SourceType::default().with_module(false);

    let parsed = Parser::new(&allocator, source, source_type).parse();
    if parsed.panicked || !parsed.errors.is_empty() {
        let reason = parsed
            .errors
            .iter()
            .map(|err| err.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        return Err(reason);
    }

    let mut program = parsed.program;
    let options = MinifierOptions {
        // Top-level names are kept by default.
        mangle: Some(MangleOptions::default()),
        compress: None,
    };
    let minified = Minifier::new(options).minify(&allocator, &mut program);

    let code = Codegen::new()
        .with_options(CodegenOptions::minify())
        .with_scoping(minified.scoping)
        .build(&program)
        .code;

    Ok(code.into_bytes())
}
