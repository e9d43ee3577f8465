//! Server-side HTML rendering backed by `minijinja`.
//!
//! Templates are compiled once at startup from sources embedded in the
//! binary. Names ending in `.html` are auto-escaped.

use std::sync::{Arc, LazyLock};

use axum::response::Html;
use minijinja::Environment;
use serde::Serialize;

const ERROR_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{{ status }}</title>
  <link rel="stylesheet" href="/public/css/styles.css">
</head>
<body>
  <div class="centered">
    <h1 class="display-3">{{ status }}</h1>
    <p>{{ message }}</p>
    <a class="btn btn-light" href="/">Home</a>
  </div>
</body>
</html>
"#;

static ERROR_VIEWS: LazyLock<Environment<'static>> = LazyLock::new(|| {
    let mut env = Environment::new();
    if let Err(err) = env.add_template("error.html", ERROR_TEMPLATE) {
        tracing::error!("invalid built-in error template: {err}");
    }
    env
});

/// A named set of compiled templates, cheap to clone into handler state.
#[derive(Clone)]
pub struct Views {
    env: Arc<Environment<'static>>,
}

impl Views {
    pub fn new(templates: &[(&'static str, &'static str)]) -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        for (name, source) in templates {
            env.add_template(name, source)?;
        }
        Ok(Self { env: Arc::new(env) })
    }

    pub fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<Html<String>, minijinja::Error> {
        let template = self.env.get_template(name)?;
        Ok(Html(template.render(ctx)?))
    }
}

/// Renders the built-in error page. Falls back to the bare message if the
/// template itself fails, so an error response is always produced.
pub fn render_error(status: u16, message: &str) -> Html<String> {
    let rendered = ERROR_VIEWS
        .get_template("error.html")
        .and_then(|t| t.render(minijinja::context! { status, message }));

    match rendered {
        Ok(html) => Html(html),
        Err(err) => {
            tracing::error!("failed to render error page: {err}");
            Html(format!("{status} {message}"))
        },
    }
}
