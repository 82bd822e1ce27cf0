use crate::table::{Header, Row};
use anyhow::Result;
use ratatui::style::Color;
use tracing::warn;

/// Derived display values for one row: marker text appended next to the name
/// and an optional color hint. Decorations never touch canonical row data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decoration {
    pub markers: Vec<&'static str>,
    pub fg: Option<Color>,
}

impl Decoration {
    pub fn is_plain(&self) -> bool {
        self.markers.is_empty() && self.fg.is_none()
    }
}

/// Auxiliary lookups a decorator may consult. The capability can be absent
/// in restricted contexts; decorators that need it skip themselves.
pub struct DecorContext<'a> {
    forwarded_paths: &'a [String],
}

impl<'a> DecorContext<'a> {
    pub fn new(forwarded_paths: &'a [String]) -> Self {
        Self { forwarded_paths }
    }

    pub fn has_port_forward(&self, id: &str) -> bool {
        self.forwarded_paths.iter().any(|path| path == id)
    }
}

pub trait Decorator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Produce extra display values for `row`, or `None` when the decorator
    /// does not apply. Returning an error skips this decorator for this row
    /// only; the render pass continues.
    fn decorate(
        &self,
        row: &Row,
        header: &Header,
        ctx: Option<&DecorContext>,
    ) -> Result<Option<Decoration>>;
}

/// Marks rows with an active port-forward session. Requires the capability;
/// without it the decorator is a no-op.
pub struct PortForwardDecorator;

impl Decorator for PortForwardDecorator {
    fn name(&self) -> &'static str {
        "port-forward"
    }

    fn decorate(
        &self,
        row: &Row,
        _header: &Header,
        ctx: Option<&DecorContext>,
    ) -> Result<Option<Decoration>> {
        let Some(ctx) = ctx else {
            return Ok(None);
        };
        if !ctx.has_port_forward(&row.id) {
            return Ok(None);
        }
        Ok(Some(Decoration {
            markers: vec!["⇄"],
            fg: Some(Color::Cyan),
        }))
    }
}

/// Dims rows whose STATUS column reports a terminal phase.
pub struct PhaseDecorator;

const TERMINAL_PHASES: [&str; 4] = ["Succeeded", "Completed", "Failed", "Error"];

impl Decorator for PhaseDecorator {
    fn name(&self) -> &'static str {
        "phase"
    }

    fn decorate(
        &self,
        row: &Row,
        header: &Header,
        _ctx: Option<&DecorContext>,
    ) -> Result<Option<Decoration>> {
        let Some(index) = header.index_of("STATUS") else {
            return Ok(None);
        };
        let Some(phase) = row.fields.get(index) else {
            return Ok(None);
        };

        if phase == "Failed" || phase == "Error" {
            return Ok(Some(Decoration {
                markers: Vec::new(),
                fg: Some(Color::Red),
            }));
        }
        if TERMINAL_PHASES.contains(&phase.as_str()) {
            return Ok(Some(Decoration {
                markers: Vec::new(),
                fg: Some(Color::DarkGray),
            }));
        }
        Ok(None)
    }
}

/// Ordered decorator chain. Purely additive to the rendered view: markers
/// accumulate, later color hints win, and any individual failure is absorbed.
pub struct DecoratorSet {
    decorators: Vec<Box<dyn Decorator>>,
}

impl DecoratorSet {
    pub fn standard() -> Self {
        Self {
            decorators: vec![Box::new(PortForwardDecorator), Box::new(PhaseDecorator)],
        }
    }

    pub fn none() -> Self {
        Self {
            decorators: Vec::new(),
        }
    }

    pub fn with(decorators: Vec<Box<dyn Decorator>>) -> Self {
        Self { decorators }
    }

    pub fn apply(&self, row: &Row, header: &Header, ctx: Option<&DecorContext>) -> Decoration {
        let mut merged = Decoration::default();
        for decorator in &self.decorators {
            match decorator.decorate(row, header, ctx) {
                Ok(Some(decoration)) => {
                    merged.markers.extend(decoration.markers);
                    if decoration.fg.is_some() {
                        merged.fg = decoration.fg;
                    }
                }
                Ok(None) => {}
                Err(error) => {
                    warn!(
                        decorator = decorator.name(),
                        id = row.id.as_str(),
                        "decorator failed, skipping: {error:#}"
                    );
                }
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::{
        DecorContext, Decoration, Decorator, DecoratorSet, PhaseDecorator, PortForwardDecorator,
    };
    use crate::table::{Header, Row};
    use anyhow::{Result, bail};
    use ratatui::style::Color;

    fn pod_row(status: &str) -> (Header, Row) {
        (
            Header::from_names(&["NAMESPACE", "NAME", "STATUS"]),
            Row::new(
                "default/pod1",
                vec!["default".into(), "pod1".into(), status.into()],
            ),
        )
    }

    struct ExplodingDecorator;

    impl Decorator for ExplodingDecorator {
        fn name(&self) -> &'static str {
            "exploding"
        }

        fn decorate(
            &self,
            _row: &Row,
            _header: &Header,
            _ctx: Option<&DecorContext>,
        ) -> Result<Option<Decoration>> {
            bail!("lookup backend unavailable")
        }
    }

    #[test]
    fn port_forward_decorator_skips_without_capability() {
        let (header, row) = pod_row("Running");
        let set = DecoratorSet::with(vec![Box::new(PortForwardDecorator)]);

        assert!(set.apply(&row, &header, None).is_plain());
    }

    #[test]
    fn port_forward_decorator_marks_forwarded_rows() {
        let (header, row) = pod_row("Running");
        let forwarded = vec!["default/pod1".to_string()];
        let ctx = DecorContext::new(&forwarded);
        let set = DecoratorSet::with(vec![Box::new(PortForwardDecorator)]);

        let decoration = set.apply(&row, &header, Some(&ctx));
        assert_eq!(decoration.markers, vec!["⇄"]);
        assert_eq!(decoration.fg, Some(Color::Cyan));
    }

    #[test]
    fn failing_decorator_does_not_abort_the_chain() {
        let (header, row) = pod_row("Failed");
        let set = DecoratorSet::with(vec![
            Box::new(ExplodingDecorator),
            Box::new(PhaseDecorator),
        ]);

        let decoration = set.apply(&row, &header, None);
        assert_eq!(decoration.fg, Some(Color::Red));
    }

    #[test]
    fn empty_decorator_set_leaves_rows_plain() {
        let (header, row) = pod_row("Running");
        assert!(DecoratorSet::none().apply(&row, &header, None).is_plain());
    }

    #[test]
    fn phase_decorator_dims_terminal_phases() {
        let (header, row) = pod_row("Succeeded");
        let set = DecoratorSet::with(vec![Box::new(PhaseDecorator)]);

        assert_eq!(set.apply(&row, &header, None).fg, Some(Color::DarkGray));
        let (header, row) = pod_row("Running");
        assert!(set.apply(&row, &header, None).is_plain());
    }
}
