use app_core::view::Views;

const TEMPLATES: &[(&str, &str)] = &[
    ("layout.html", include_str!("../../templates/layout.html")),
    ("_providers.html", include_str!("../../templates/_providers.html")),
    ("home.html", include_str!("../../templates/home.html")),
    ("login.html", include_str!("../../templates/login.html")),
    ("register.html", include_str!("../../templates/register.html")),
    ("secrets.html", include_str!("../../templates/secrets.html")),
];

/// Compiles the page templates served by the auth router.
pub fn views() -> Result<Views, minijinja::Error> {
    Views::new(TEMPLATES)
}
