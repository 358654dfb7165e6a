use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("`{0}` not in program arguments")]
pub struct MissingFlag(pub String);

/// Argument list handed to the generator, edited in place by the submitter.
///
/// A flag "has a value" when it is followed by something that isn't itself
/// a flag, so `--hepmc --zip` leaves `--hepmc` without a value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramArgs(Vec<String>);

impl ProgramArgs {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(args.into_iter().map(Into::into).collect())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }

    pub fn contains(&self, flag: &str) -> bool {
        self.position(flag).is_some()
    }

    fn position(&self, flag: &str) -> Option<usize> {
        self.0.iter().position(|arg| arg == flag)
    }

    pub fn get(&self, flag: &str) -> Result<Option<&str>, MissingFlag> {
        let index = self.position(flag).ok_or_else(|| MissingFlag(flag.to_owned()))?;
        Ok(self
            .0
            .get(index + 1)
            .filter(|value| !value.starts_with('-'))
            .map(String::as_str))
    }

    /// Value of `flag`, `None` when the flag is absent or has no value.
    pub fn value(&self, flag: &str) -> Option<&str> {
        self.get(flag).ok().flatten()
    }

    pub fn set(&mut self, flag: &str, value: impl Into<String>) -> Result<(), MissingFlag> {
        let index = self.position(flag).ok_or_else(|| MissingFlag(flag.to_owned()))?;
        let value = value.into();
        if self.get(flag)?.is_some() {
            self.0[index + 1] = value;
        } else {
            self.0.insert(index + 1, value);
        }
        Ok(())
    }

    pub fn set_or_push(&mut self, flag: &str, value: impl Into<String>) {
        let value = value.into();
        if self.contains(flag) {
            // can't fail, the flag is there
            let _ = self.set(flag, value);
        } else {
            self.0.push(flag.to_owned());
            self.0.push(value);
        }
    }

    pub fn push(&mut self, arg: impl Into<String>) {
        self.0.push(arg.into());
    }
}

impl<S: Into<String>> FromIterator<S> for ProgramArgs {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::new(iter)
    }
}
