/// Asks the user before a destructive action is carried out.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

/// A decision that was already made, e.g. a `confirm=true` query parameter.
impl Confirm for bool {
    fn confirm(&self, _prompt: &str) -> bool {
        *self
    }
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}
