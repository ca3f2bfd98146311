//! HTML template for exported courses.
//!
//! Rendered with auto-escaping on. Only three values bypass it with `safe`:
//! lecture bodies flagged as HTML by the service, and `data:` URIs built from
//! validated mime types and base64.

/// Name the template is registered under; the `.html` suffix enables
/// auto-escaping.
pub const COURSE_TEMPLATE_NAME: &str = "course.html";

/// The course document template.
pub const COURSE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{ title }}</title>
<style>
body { font-family: Georgia, serif; max-width: 48rem; margin: 2rem auto; padding: 0 1rem; line-height: 1.6; color: #222; }
header { border-bottom: 1px solid #ccc; margin-bottom: 2rem; }
.icon { width: 96px; height: 96px; float: right; border-radius: 12px; }
.meta { color: #666; font-size: 0.9rem; }
.tags span { display: inline-block; background: #eef; border-radius: 4px; padding: 0 0.4rem; margin-right: 0.3rem; font-size: 0.8rem; }
section { margin-bottom: 3rem; }
section img { max-width: 100%; }
pre { white-space: pre-wrap; font-family: inherit; }
</style>
</head>
<body>
<header>
{% if icon %}<img class="icon" src="{{ icon | safe }}" alt="">
{% endif %}<h1>{{ title }}</h1>
{% if instructor %}<p class="meta">Instructor: {{ instructor }}</p>
{% endif %}<p class="meta">{{ difficulty }}{% if duration %} · {{ duration }}{% endif %} · {{ sections | length }} lecture{% if sections | length != 1 %}s{% endif %}</p>
{% if description %}<p>{{ description }}</p>
{% endif %}{% if tags %}<p class="tags">{% for tag in tags %}<span>{{ tag }}</span>{% endfor %}</p>
{% endif %}</header>
{% for section in sections %}<section id="lecture-{{ section.number }}">
<h2>{{ section.number }}. {{ section.title }}</h2>
{% if section.duration %}<p class="meta">{{ section.duration }}</p>
{% endif %}{% if section.image %}<img src="{{ section.image | safe }}" alt="{{ section.title }}">
{% endif %}{% if section.is_html %}{{ section.body | safe }}{% else %}<pre>{{ section.body }}</pre>{% endif %}
</section>
{% endfor %}</body>
</html>
"#;

/// Flatten a Tera error chain into one readable message.
pub fn format_tera_error(error: &tera::Error) -> String {
    use std::error::Error;

    let mut messages = vec![error.to_string()];
    let mut current: Option<&dyn Error> = error.source();
    while let Some(err) = current {
        messages.push(err.to_string());
        current = err.source();
    }
    messages.join("\n  → ")
}
