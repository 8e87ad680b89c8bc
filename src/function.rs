//! User-supplied selector functions.
//!
//! Selectors are the one place user code can fail mid-stream. A failing
//! selector returns `Err` instead of panicking; the operator turns that into
//! its own terminal `error` and disposes upstream, the same as an error
//! arriving from a source.
//!
//! Plain closures are wrapped in [`Total`] (cannot fail) or [`Fallible`]
//! (returns `Result`) by the operator methods, so callers rarely name these
//! types.

/// Maps an owned input to an output, possibly failing with `Err`.
pub trait Selector<In, Err> {
  type Output;

  fn select(&mut self, input: In) -> Result<Self::Output, Err>;
}

/// Derives a key from a borrowed element, possibly failing with `Err`.
pub trait KeySelector<Item, Key, Err> {
  fn key_of(&mut self, item: &Item) -> Result<Key, Err>;
}

/// A selector that never fails.
#[derive(Clone)]
pub struct Total<F>(pub F);

/// A selector returning `Result`.
#[derive(Clone)]
pub struct Fallible<F>(pub F);

/// The selector that returns its input.
#[derive(Clone, Copy, Default)]
pub struct Identity;

impl<F, In, Out, Err> Selector<In, Err> for Total<F>
where
  F: FnMut(In) -> Out,
{
  type Output = Out;

  #[inline]
  fn select(&mut self, input: In) -> Result<Out, Err> { Ok((self.0)(input)) }
}

impl<F, In, Out, Err> Selector<In, Err> for Fallible<F>
where
  F: FnMut(In) -> Result<Out, Err>,
{
  type Output = Out;

  #[inline]
  fn select(&mut self, input: In) -> Result<Out, Err> { (self.0)(input) }
}

impl<In, Err> Selector<In, Err> for Identity {
  type Output = In;

  #[inline]
  fn select(&mut self, input: In) -> Result<In, Err> { Ok(input) }
}

impl<F, Item, Key, Err> KeySelector<Item, Key, Err> for Total<F>
where
  F: FnMut(&Item) -> Key,
{
  #[inline]
  fn key_of(&mut self, item: &Item) -> Result<Key, Err> { Ok((self.0)(item)) }
}

impl<F, Item, Key, Err> KeySelector<Item, Key, Err> for Fallible<F>
where
  F: FnMut(&Item) -> Result<Key, Err>,
{
  #[inline]
  fn key_of(&mut self, item: &Item) -> Result<Key, Err> { (self.0)(item) }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn total_and_fallible() {
    let mut double = Total(|v: i32| v * 2);
    assert_eq!(Selector::<_, ()>::select(&mut double, 2), Ok(4));

    let mut checked = Fallible(|v: i32| if v > 0 { Ok(v) } else { Err("negative") });
    assert_eq!(checked.select(1), Ok(1));
    assert_eq!(checked.select(-1), Err("negative"));

    let mut parity = Total(|v: &i32| v % 2);
    assert_eq!(KeySelector::<_, _, ()>::key_of(&mut parity, &3), Ok(1));
  }
}
