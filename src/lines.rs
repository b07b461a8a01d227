//! A lazy, zero-copy view of the lines of a text buffer.

/// Create an iterator over the lines of `input`.
///
/// Lines are separated by `\n` and yielded without the separator. A
/// trailing newline does not produce an additional empty line; empty
/// input produces no lines at all. Every yielded slice borrows from
/// `input`.
pub(crate) fn lines(input: &str) -> Lines<'_> {
    Lines { remaining: input }
}


/// An iterator over the lines of a buffer. See [`lines`].
#[derive(Clone, Debug)]
pub(crate) struct Lines<'input> {
    remaining: &'input str,
}

impl<'input> Iterator for Lines<'input> {
    type Item = &'input str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining.is_empty() {
            return None
        }

        match self.remaining.find('\n') {
            Some(idx) => {
                let line = &self.remaining[..idx];
                self.remaining = &self.remaining[idx + 1..];
                Some(line)
            }
            None => {
                let line = self.remaining;
                self.remaining = "";
                Some(line)
            }
        }
    }
}
