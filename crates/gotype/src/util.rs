use std::fmt::{Debug, Display, Formatter};

pub fn display_fn<F>(f: F) -> DisplayFn<F>
where
    F: Fn(&mut Formatter<'_>) -> std::fmt::Result,
{
    DisplayFn(f)
}

pub struct DisplayFn<F>(F);

impl<F> Display for DisplayFn<F>
where
    F: Fn(&mut Formatter<'_>) -> std::fmt::Result,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        (self.0)(f)
    }
}

impl<F> Debug for DisplayFn<F>
where
    F: Fn(&mut Formatter<'_>) -> std::fmt::Result,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        (self.0)(f)
    }
}

/// Writes the items separated by `separator`.
pub fn write_separated<T, I>(
    f: &mut Formatter<'_>,
    items: I,
    separator: &str,
    mut write: impl FnMut(&mut Formatter<'_>, T) -> std::fmt::Result,
) -> std::fmt::Result
where
    I: IntoIterator<Item = T>,
{
    for (i, item) in items.into_iter().enumerate() {
        if i != 0 {
            f.write_str(separator)?;
        }
        write(f, item)?;
    }
    Ok(())
}

/// Byte offsets of the first character on every line.
pub fn line_starts(text: &str) -> Vec<u32> {
    let mut starts = vec![0];
    for (offset, byte) in text.bytes().enumerate() {
        if byte == b'\n' {
            starts.push(offset as u32 + 1);
        }
    }
    starts
}
