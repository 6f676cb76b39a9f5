//! The application's asset pipeline.
//!
//! | task             | prerequisites                        |
//! |------------------|--------------------------------------|
//! | `clean`          |                                      |
//! | `web-resources`  | `clean`                              |
//! | `uglify-bespoke` | `clean`                              |
//! | `uglify-vendor`  | `clean`                              |
//! | `uglify`         | `uglify-bespoke`, `uglify-vendor`    |
//! | `minify-css`     | `clean`                              |
//! | `default`        | `web-resources`, `uglify`, `minify-css` |
//!
//! Every task that writes depends on `clean`, so a full run always starts
//! from empty destination roots and re-running it yields the same tree.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};

use crate::blueprint::Blueprint;
use crate::error::{BuildError, StageError};
use crate::fileset::FileSet;
use crate::graph::TaskGraph;
use crate::output::{self, Written, destination};
use crate::transform::{self, JsOptions};

pub const CLEAN: &str = "clean";
pub const WEB_RESOURCES: &str = "web-resources";
pub const UGLIFY_BESPOKE: &str = "uglify-bespoke";
pub const UGLIFY_VENDOR: &str = "uglify-vendor";
pub const UGLIFY: &str = "uglify";
pub const MINIFY_CSS: &str = "minify-css";
pub const DEFAULT: &str = "default";

/// Where sources live and where output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Server-rendered HTML: the index page and `layouts/`.
    pub html: Utf8PathBuf,
    /// Client-loaded partial templates.
    pub partials: Utf8PathBuf,
    /// First-party scripts.
    pub scripts: Utf8PathBuf,
    /// First-party stylesheets.
    pub styles: Utf8PathBuf,
    /// Local cache of third-party packages.
    pub vendor: Utf8PathBuf,

    /// Root read by the server-side renderer.
    pub templates_root: Utf8PathBuf,
    /// Root served to the client.
    pub static_root: Utf8PathBuf,

    /// Vendor scripts relative to [`Layout::vendor`], in load order.
    pub vendor_scripts: Vec<String>,
    /// Vendor stylesheets relative to [`Layout::vendor`], in cascade order.
    pub vendor_styles: Vec<String>,
    /// First-party script patterns relative to [`Layout::scripts`].
    pub bespoke_scripts: Vec<String>,
    /// First-party stylesheet patterns relative to [`Layout::styles`].
    pub bespoke_styles: Vec<String>,

    pub vendor_bundle: String,
    pub script_bundle: String,
    pub style_bundle: String,
}

impl Layout {
    /// The default layout rooted at `root`.
    pub fn new(root: impl AsRef<Utf8Path>) -> Self {
        let root = root.as_ref();
        let at = |suffix: &str| root.join(suffix);

        Self {
            html: at("web/html"),
            partials: at("web/html/partials"),
            scripts: at("web/js"),
            styles: at("web/css"),
            vendor: at("bower_components"),
            templates_root: at("hipflask/templates"),
            static_root: at("hipflask/static"),
            vendor_scripts: strings(&[
                "lodash/dist/lodash.js",
                "jquery/dist/jquery.js",
                "bootstrap-css/js/bootstrap.js",
                "angular/angular.js",
                "angular-ui-router/release/angular-ui-router.js",
            ]),
            vendor_styles: strings(&[
                "bootstrap-css/css/bootstrap.css",
                "bootstrap-css/css/bootstrap-theme.css",
            ]),
            bespoke_scripts: strings(&["**/*.js"]),
            bespoke_styles: strings(&["rainbow.css"]),
            vendor_bundle: "vendor.min.js".into(),
            script_bundle: "hipflask.min.js".into(),
            style_bundle: "hipflask.min.css".into(),
        }
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::new(".")
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

/// Per-invocation switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    /// Copy bespoke scripts through instead of bundling them.
    pub skip_minify: bool,
}

/// Declare the pipeline over `layout`.
pub fn blueprint(layout: Layout, options: Options) -> Blueprint {
    let layout = Arc::new(layout);
    let mut blueprint = Blueprint::new();

    let with = |f: fn(&Layout, Options) -> Result<Vec<Written>, StageError>| {
        let layout = layout.clone();
        move || f(&layout, options).map(|written| report(&written))
    };

    blueprint.task(CLEAN).run(with(|layout, _| clean(layout).map(|()| Vec::new())));
    blueprint
        .task(WEB_RESOURCES)
        .depends_on([CLEAN])
        .run(with(|layout, _| web_resources(layout)));
    blueprint
        .task(UGLIFY_BESPOKE)
        .depends_on([CLEAN])
        .run(with(bespoke_scripts));
    blueprint
        .task(UGLIFY_VENDOR)
        .depends_on([CLEAN])
        .run(with(|layout, _| vendor_scripts(layout)));
    blueprint
        .task(UGLIFY)
        .depends_on([UGLIFY_BESPOKE, UGLIFY_VENDOR])
        .group();
    blueprint
        .task(MINIFY_CSS)
        .depends_on([CLEAN])
        .run(with(|layout, _| stylesheets(layout)));
    blueprint
        .task(DEFAULT)
        .depends_on([WEB_RESOURCES, UGLIFY, MINIFY_CSS])
        .group();
    blueprint.default_task(DEFAULT);

    blueprint
}

fn report(written: &[Written]) {
    for file in written {
        tracing::info!(path = %file.path, hash = %file.hash, "written");
    }
}

/// Declare and validate the pipeline.
pub fn graph(layout: Layout, options: Options) -> Result<TaskGraph, BuildError> {
    blueprint(layout, options).finish()
}

/// Remove both destination roots.
pub fn clean(layout: &Layout) -> Result<(), StageError> {
    output::clean([&layout.static_root, &layout.templates_root])?;
    Ok(())
}

/// Copy server templates and client partials to where they are served from.
pub fn web_resources(layout: &Layout) -> Result<Vec<Written>, StageError> {
    let templates = FileSet::resolve(&layout.html, ["index.html", "layouts/*.html"])?;
    let partials = FileSet::resolve(&layout.partials, ["*.html"])?;

    let mut outputs = transform::copy(&templates, &layout.templates_root)?;
    outputs.extend(transform::copy(&partials, destination(&layout.static_root, "/partials"))?);

    Ok(output::write_all(outputs)?)
}

/// First-party scripts into `js/`, bundled unless `skip_minify` is set.
pub fn bespoke_scripts(layout: &Layout, options: Options) -> Result<Vec<Written>, StageError> {
    let files = FileSet::resolve(&layout.scripts, &layout.bespoke_scripts)?;
    let outputs = transform::scripts(
        &files,
        &layout.script_bundle,
        destination(&layout.static_root, "/js"),
        JsOptions {
            skip_minify: options.skip_minify,
        },
    )?;

    Ok(output::write_all(outputs)?)
}

/// Third-party scripts concatenated in load order into `js/vendor/`.
pub fn vendor_scripts(layout: &Layout) -> Result<Vec<Written>, StageError> {
    let files = FileSet::resolve(&layout.vendor, &layout.vendor_scripts)?;

    if files.len() < layout.vendor_scripts.len() {
        tracing::warn!(
            found = files.len(),
            declared = layout.vendor_scripts.len(),
            "some vendor scripts are missing from {}",
            layout.vendor
        );
    }

    let bundle = transform::bundle_js(&layout.vendor_bundle, &files)?;
    let out = bundle.into_output(destination(&layout.static_root, "/js/vendor"));

    Ok(output::write_all(vec![out])?)
}

/// Vendor stylesheets followed by first-party ones, compressed into `css/`.
pub fn stylesheets(layout: &Layout) -> Result<Vec<Written>, StageError> {
    let vendor = FileSet::resolve(&layout.vendor, &layout.vendor_styles)?;
    let bespoke = FileSet::resolve(&layout.styles, &layout.bespoke_styles)?;
    let files = vendor.chain(bespoke);

    let bundle = transform::bundle_css(&layout.style_bundle, &files)?;
    let out = bundle.into_output(destination(&layout.static_root, "/css"));

    Ok(output::write_all(vec![out])?)
}
