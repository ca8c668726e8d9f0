//! Embedded web UI: the prediction form and its result block.

use axum::response::Html;

use crate::encoder::EncoderSet;
use crate::predict::{PredictionForm, FIELD_COLUMNS};

const INDEX_HTML: &str = include_str!("../static/index.html");

const FORM_MARKER: &str = "<!--FORM-->";
const RESULT_MARKER: &str = "<!--RESULT-->";

/// What one rendered page shows.
#[derive(Debug, Default)]
pub struct PageView<'a> {
    /// Encoders used to populate the selects. `None` hides the form, which is
    /// the case whenever the artifacts failed to load.
    pub encoders: Option<&'a EncoderSet>,
    /// Previous submission, kept selected after a POST.
    pub submitted: Option<&'a PredictionForm>,
    /// Prediction or error text. Empty renders no result block.
    pub prediction_text: &'a str,
    pub is_error: bool,
}

pub fn render_page(view: &PageView<'_>) -> Html<String> {
    let form = view
        .encoders
        .map(|encoders| render_form(encoders, view.submitted))
        .unwrap_or_default();

    let result = if view.prediction_text.is_empty() {
        String::new()
    } else {
        let class = if view.is_error { "result error" } else { "result" };
        format!(
            "    <div class=\"{class}\" role=\"status\">{}</div>\n",
            escape_html(view.prediction_text)
        )
    };

    Html(
        INDEX_HTML
            .replace(FORM_MARKER, &form)
            .replace(RESULT_MARKER, &result),
    )
}

fn field_label(field: &str) -> &'static str {
    match field {
        "gender" => "Gender",
        "race_ethnicity" => "Race/Ethnicity",
        "lunch" => "Lunch",
        "test_preparation_course" => "Test Preparation Course",
        _ => "",
    }
}

fn render_form(encoders: &EncoderSet, submitted: Option<&PredictionForm>) -> String {
    let mut html = String::from("    <form method=\"post\" action=\"/\">\n");
    for (field, column) in FIELD_COLUMNS {
        let selected = submitted.and_then(|f| f.field(field));
        html.push_str(&format!(
            "      <label for=\"{field}\">{}</label>\n",
            field_label(field)
        ));
        match encoders.get(column) {
            Some(encoder) => {
                html.push_str(&format!(
                    "      <select id=\"{field}\" name=\"{field}\" required>\n"
                ));
                for class in encoder.classes() {
                    let escaped = escape_html(class);
                    let attr = if selected == Some(class.as_str()) {
                        " selected"
                    } else {
                        ""
                    };
                    html.push_str(&format!(
                        "        <option value=\"{escaped}\"{attr}>{escaped}</option>\n"
                    ));
                }
                html.push_str("      </select>\n");
            }
            // No vocabulary to offer; let the user type and let prediction report it.
            None => html.push_str(&format!(
                "      <input type=\"text\" id=\"{field}\" name=\"{field}\" value=\"{}\" required>\n",
                escape_html(selected.unwrap_or_default())
            )),
        }
    }
    html.push_str("      <button type=\"submit\">Predict</button>\n    </form>\n");
    html
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::LabelEncoder;

    fn encoders() -> EncoderSet {
        [(
            "lunch".to_string(),
            LabelEncoder::new(vec!["free/reduced".into(), "standard".into()]).unwrap(),
        )]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_empty_page_has_form_and_no_result() {
        let encoders = encoders();
        let Html(page) = render_page(&PageView {
            encoders: Some(&encoders),
            ..Default::default()
        });
        assert!(page.contains("<form method=\"post\""));
        assert!(page.contains("<option value=\"standard\">standard</option>"));
        // Columns without an encoder fall back to a text input.
        assert!(page.contains("<input type=\"text\" id=\"gender\""));
        assert!(!page.contains("class=\"result"));
        assert!(!page.contains(FORM_MARKER));
    }

    #[test]
    fn test_error_page_hides_form() {
        let Html(page) = render_page(&PageView {
            prediction_text: "ERROR: <missing>",
            is_error: true,
            ..Default::default()
        });
        assert!(!page.contains("<form"));
        assert!(page.contains("class=\"result error\""));
        assert!(page.contains("ERROR: &lt;missing&gt;"));
    }

    #[test]
    fn test_submitted_value_stays_selected() {
        let encoders = encoders();
        let submitted = PredictionForm {
            lunch: Some("standard".into()),
            ..Default::default()
        };
        let Html(page) = render_page(&PageView {
            encoders: Some(&encoders),
            submitted: Some(&submitted),
            prediction_text: "Result: PASS (Pass probability: 90.00%)",
            is_error: false,
        });
        assert!(page.contains("<option value=\"standard\" selected>standard</option>"));
        assert!(page.contains("<div class=\"result\" role=\"status\">Result: PASS"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">&'"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#x27;"
        );
    }
}
