mod common;

use std::fs;

use assetline::pipeline::{self, CLEAN, MINIFY_CSS, UGLIFY_BESPOKE, UGLIFY_VENDOR};
use assetline::{BuildError, Executor, Options, StageError, TaskState, TransformError};

use common::Project;

#[test]
fn default_builds_the_full_tree() {
    let project = Project::new();

    let diagnostics = project.run(None, Options::default()).unwrap();
    assert!(diagnostics.states.values().all(|state| *state == TaskState::Done));

    assert_eq!(
        project.read("hipflask/templates/index.html"),
        project.read("web/html/index.html")
    );
    assert_eq!(
        project.read("hipflask/templates/layouts/base.html"),
        project.read("web/html/layouts/base.html")
    );
    assert!(project.exists("hipflask/templates/layouts/nav.html"));
    assert_eq!(
        project.read("hipflask/static/partials/home.html"),
        "<section>home</section>\n"
    );

    assert!(project.exists("hipflask/static/js/hipflask.min.js"));
    assert!(!project.exists("hipflask/static/js/app.js"));
    assert!(project.exists("hipflask/static/js/vendor/vendor.min.js"));
    assert!(project.exists("hipflask/static/css/hipflask.min.css"));

    // Nothing the server renders leaks into the static root or vice versa.
    assert!(!project.exists("hipflask/static/index.html"));
    assert!(!project.exists("hipflask/templates/partials"));
}

#[test]
fn vendor_bundle_follows_load_order() {
    let project = Project::new();
    project.run(Some(UGLIFY_VENDOR), Options::default()).unwrap();

    let bundle = project.read("hipflask/static/js/vendor/vendor.min.js");
    let positions: Vec<usize> = [
        "lodashMarker",
        "jqueryMarker",
        "bootstrapMarker",
        "angularMarker",
        "routerMarker",
    ]
    .iter()
    .map(|marker| bundle.find(marker).unwrap())
    .collect();

    assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    assert!(!bundle.contains("hipflaskApp"));
}

#[test]
fn stylesheet_puts_vendor_before_bespoke() {
    let project = Project::new();
    project.run(Some(MINIFY_CSS), Options::default()).unwrap();

    let css = project.read("hipflask/static/css/hipflask.min.css");
    let btn = css.find(".btn{").unwrap();
    let theme = css.find(".btn-default").unwrap();
    let rainbow = css.find(".rainbow").unwrap();

    assert!(btn < theme && theme < rainbow);
    assert!(!css.contains("ours"));
}

#[test]
fn skip_minify_copies_bespoke_scripts() {
    let project = Project::new();
    project
        .run(Some(UGLIFY_BESPOKE), Options { skip_minify: true })
        .unwrap();

    assert_eq!(
        project.read("hipflask/static/js/app.js"),
        project.read("web/js/app.js")
    );
    assert_eq!(
        project.read("hipflask/static/js/config/routes.js"),
        project.read("web/js/config/routes.js")
    );
    assert!(!project.exists("hipflask/static/js/hipflask.min.js"));
}

#[test]
fn rebuild_is_idempotent() {
    let project = Project::new();

    project.run(None, Options::default()).unwrap();
    let first = project.snapshot();

    // Stale output from an earlier, different run must not survive.
    project.file("hipflask/static/js/stale.js", "var stale;");
    project.file("hipflask/templates/old.html", "<old>");

    project.run(None, Options::default()).unwrap();
    let second = project.snapshot();

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn sequential_and_parallel_agree() {
    let parallel = Project::new();
    parallel.run(None, Options::default()).unwrap();

    let sequential = Project::new();
    let graph = pipeline::graph(sequential.layout(), Options::default()).unwrap();
    Executor::new(&graph).parallel(false).run(None).unwrap();

    assert_eq!(parallel.snapshot(), sequential.snapshot());
}

#[test]
fn clean_removes_both_roots() {
    let project = Project::new();
    project.run(None, Options::default()).unwrap();

    fs::remove_dir_all(project.root.join("hipflask/static")).unwrap();
    project.run(Some(CLEAN), Options::default()).unwrap();

    assert!(!project.exists("hipflask/static"));
    assert!(!project.exists("hipflask/templates"));
}

#[test]
fn missing_vendor_cache_fails_the_vendor_task() {
    let project = Project::new();
    fs::remove_dir_all(project.root.join("bower_components")).unwrap();

    let err = project
        .run(Some(UGLIFY_VENDOR), Options::default())
        .unwrap_err();

    assert_eq!(err.failed_task(), Some(UGLIFY_VENDOR));
    assert!(matches!(
        err,
        BuildError::Task {
            source: StageError::Resolution(_),
            ..
        }
    ));
    assert!(!project.exists("hipflask/static/js/vendor"));
}

#[test]
fn missing_vendor_entry_is_tolerated() {
    let project = Project::new();
    fs::remove_file(project.root.join("bower_components/jquery/dist/jquery.js"))
        .unwrap();

    project.run(Some(UGLIFY_VENDOR), Options::default()).unwrap();

    let bundle = project.read("hipflask/static/js/vendor/vendor.min.js");
    assert!(bundle.contains("lodashMarker"));
    assert!(!bundle.contains("jqueryMarker"));
}

#[test]
fn broken_stylesheet_fails_the_build() {
    let project = Project::new();
    project.file("web/css/rainbow.css", ".rainbow { color: green;");

    let err = project.run(None, Options::default()).unwrap_err();

    assert_eq!(err.failed_task(), Some(MINIFY_CSS));
    match err {
        BuildError::Task {
            source: StageError::Transform(TransformError::Source { file, .. }),
            ..
        } => assert_eq!(file, project.root.join("web/css/rainbow.css")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!project.exists("hipflask/static/css/hipflask.min.css"));
}

#[test]
fn vendor_bundle_keeps_wrapped_libraries_working() {
    let project = Project::new();
    project.file(
        "bower_components/lodash/dist/lodash.js",
        "(function (root) {\n  'use strict';\n  var version = '4.17';\n  \
         root._ = { version: version };\n}(this));\n",
    );
    project.file(
        "bower_components/jquery/dist/jquery.js",
        "(function (global) {\n  'use strict';\n  \
         global.jQuery = { lodash: _.version };\n})(window);\n",
    );
    project.file(
        "bower_components/angular/angular.js",
        "(function (window) {\n  'use strict';\n  var ng = window.angular = {};\n  \
         ng.element = jQuery;\n})(window);\n",
    );

    project.run(Some(UGLIFY_VENDOR), Options::default()).unwrap();
    let bundle = project.read("hipflask/static/js/vendor/vendor.min.js");

    let lodash = bundle.find("._=").unwrap();
    let jquery = bundle.find(".jQuery=").unwrap();
    let angular = bundle.find(".angular=").unwrap();
    let router = bundle.find("routerMarker").unwrap();
    assert!(lodash < jquery && jquery < angular && angular < router, "{bundle}");

    // Globals shared between files keep their names.
    assert!(bundle.contains("_.version"), "{bundle}");
    assert!(bundle.contains("=jQuery"), "{bundle}");
    assert_eq!(bundle.matches("use strict").count(), 3, "{bundle}");
    assert!(!bundle.contains("=>"), "{bundle}");
}
