//! `{{ expr }}` placeholders in request text.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Expr(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Template {
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unclosed placeholder starting at byte {0} (missing '}}}}')")]
    UnclosedExpression(usize),
    #[error("empty placeholder at byte {0}")]
    EmptyExpression(usize),
}

pub fn parse_template(input: &str) -> Result<Template, TemplateError> {
    let mut segments = Vec::new();
    let mut rest = input;
    let mut offset = 0;

    while let Some(start) = rest.find("{{") {
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            return Err(TemplateError::UnclosedExpression(offset + start));
        };
        let inner = after_open[..end].trim();
        if inner.is_empty() {
            return Err(TemplateError::EmptyExpression(offset + start));
        }
        if start > 0 {
            segments.push(Segment::Literal(rest[..start].to_string()));
        }
        segments.push(Segment::Expr(inner.to_string()));

        let consumed = start + 2 + end + 2;
        offset += consumed;
        rest = &rest[consumed..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Literal(rest.to_string()));
    }
    Ok(Template { segments })
}

pub fn has_expressions(input: &str) -> bool {
    input.contains("{{")
}

impl Template {
    pub fn expressions(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Expr(e) => Some(e.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Renders with `resolve`; placeholders it cannot resolve stay as written.
    pub fn render(&self, mut resolve: impl FnMut(&str) -> Option<String>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Expr(e) => match resolve(e) {
                    Some(v) => out.push_str(&v),
                    None => {
                        out.push_str("{{");
                        out.push_str(e);
                        out.push_str("}}");
                    }
                },
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_literals_and_expressions() {
        let t = parse_template("https://{{ host }}/users/{{id}}").unwrap();
        assert_eq!(
            t.segments,
            vec![
                Segment::Literal("https://".into()),
                Segment::Expr("host".into()),
                Segment::Literal("/users/".into()),
                Segment::Expr("id".into()),
            ]
        );
    }

    #[test]
    fn json_braces_are_literal() {
        let t = parse_template("{\"a\": {\"b\": 1}}").unwrap();
        assert_eq!(t.expressions().count(), 0);
    }

    #[test]
    fn unclosed_is_an_error() {
        assert_eq!(
            parse_template("x {{ y").unwrap_err(),
            TemplateError::UnclosedExpression(2)
        );
    }

    #[test]
    fn render_keeps_unresolved() {
        let t = parse_template("{{a}}-{{b}}").unwrap();
        let out = t.render(|e| (e == "a").then(|| "1".to_string()));
        assert_eq!(out, "1-{{b}}");
    }
}
