//! View trait: the capability contract every view implements.
//!
//! A view is a pure description of "my data, rendered to markup" plus two
//! hooks the reconciler consults: [`state_changed`](View::state_changed)
//! (may the previous instance be reused?) and [`update`](View::update)
//! (absorb new options; report whether a re-render is needed). Shared
//! behavior is composed through the [`ViewHost`](super::ViewHost) rather
//! than inherited — there is no base-class chain.

use std::any::Any;

/// Core trait implemented by all views.
///
/// Object-safe: the host stores views as `Box<dyn View>` and uses `as_any`
/// for concrete-type checks and downcasting, mirroring how the reconciler
/// decides whether a live instance still matches a component's declared view
/// type.
pub trait View: 'static {
    /// Short type name for logs and diagnostics (e.g. `"SidebarView"`).
    fn type_name(&self) -> &str;

    /// Render this view's data to markup. A pure function of the view's
    /// current state; the host owns where the markup lands.
    fn render(&self) -> String;

    /// Whether this view's externally-visible state has diverged since it
    /// was last applied.
    ///
    /// Defaults to `true`, which means a view is rebuilt on every pass
    /// unless its concrete type opts into reuse by comparing the fields
    /// that actually matter.
    fn state_changed(&self) -> bool {
        true
    }

    /// Absorb pass-level options on a reused view. Returns whether the
    /// view's derived state changed and its markup must be re-rendered.
    fn update(&mut self, options: &crate::options::ViewOptions) -> bool {
        let _ = options;
        false
    }

    /// Downcast support.
    fn as_any(&self) -> &dyn Any;

    /// Mutable downcast support.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ViewOptions;

    struct Label {
        text: String,
    }

    impl View for Label {
        fn type_name(&self) -> &str {
            "Label"
        }

        fn render(&self) -> String {
            format!("<span>{}</span>", self.text)
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn defaults() {
        let label = Label { text: "x".into() };
        assert!(label.state_changed());
        let mut label = label;
        assert!(!label.update(&ViewOptions::new()));
    }

    #[test]
    fn render_is_pure_markup() {
        let label = Label { text: "hi".into() };
        assert_eq!(label.render(), "<span>hi</span>");
    }

    #[test]
    fn object_safe_and_downcastable() {
        let boxed: Box<dyn View> = Box::new(Label { text: "dyn".into() });
        assert_eq!(boxed.type_name(), "Label");
        let label = boxed.as_any().downcast_ref::<Label>().unwrap();
        assert_eq!(label.text, "dyn");
    }
}
