#![allow(dead_code)]

use std::fs;

use assetline::output::digest_tree;
use assetline::pipeline;
use assetline::{BuildError, Diagnostics, Executor, Hash32, Layout, Options};
use camino::{Utf8Path, Utf8PathBuf};

/// A project tree with every source the default layout expects.
pub struct Project {
    _dir: tempfile::TempDir,
    pub root: Utf8PathBuf,
}

impl Project {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        let project = Self { _dir: dir, root };

        project.file(
            "web/html/index.html",
            "<!doctype html><html>{% block body %}{% endblock %}</html>\n",
        );
        project.file("web/html/layouts/base.html", "<main>{{ content }}</main>\n");
        project.file("web/html/layouts/nav.html", "<nav></nav>\n");
        project.file("web/html/partials/home.html", "<section>home</section>\n");

        project.file(
            "web/js/app.js",
            "var hipflaskApp = angular.module('Hipflask', []);\n",
        );
        project.file(
            "web/js/config/routes.js",
            "(function () {\n  'use strict';\n  var fallback = '/';\n}());\n",
        );
        project.file(
            "web/css/rainbow.css",
            "/* ours */\n.rainbow {\n  color: green;\n}\n",
        );

        project.file("bower_components/lodash/dist/lodash.js", "var lodashMarker = 1;\n");
        project.file("bower_components/jquery/dist/jquery.js", "var jqueryMarker = 2;\n");
        project.file(
            "bower_components/bootstrap-css/js/bootstrap.js",
            "var bootstrapMarker = 3;\n",
        );
        project.file("bower_components/angular/angular.js", "var angularMarker = 4;\n");
        project.file(
            "bower_components/angular-ui-router/release/angular-ui-router.js",
            "var routerMarker = 5;\n",
        );
        project.file(
            "bower_components/bootstrap-css/css/bootstrap.css",
            ".btn {\n  padding: 6px;\n}\n",
        );
        project.file(
            "bower_components/bootstrap-css/css/bootstrap-theme.css",
            ".btn-default {\n  color: #333;\n}\n",
        );

        project
    }

    pub fn file(&self, path: &str, text: &str) {
        let path = self.root.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    pub fn layout(&self) -> Layout {
        Layout::new(&self.root)
    }

    pub fn read(&self, path: &str) -> String {
        fs::read_to_string(self.root.join(path)).unwrap()
    }

    pub fn exists(&self, path: &str) -> bool {
        self.root.join(path).exists()
    }

    pub fn run(&self, task: Option<&str>, options: Options) -> Result<Diagnostics, BuildError> {
        let graph = pipeline::graph(self.layout(), options).unwrap();
        Executor::new(&graph).run(task)
    }

    /// Digests of both destination roots, templates prefixed with `templates/`.
    pub fn snapshot(&self) -> Vec<(Utf8PathBuf, Hash32)> {
        let layout = self.layout();
        let mut acc: Vec<_> = digest_tree(&layout.static_root)
            .unwrap()
            .into_iter()
            .collect();
        acc.extend(
            digest_tree(&layout.templates_root)
                .unwrap()
                .into_iter()
                .map(|(path, hash)| (Utf8Path::new("templates").join(path), hash)),
        );
        acc
    }
}
