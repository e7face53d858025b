//! The per-channel processing abstraction shared by the composites.

use crate::context::Context;
use crate::Float;

/// One channel of a composite, advanced a sample at a time.
///
/// `Input` carries the voltages read from the host's ports for this channel
/// and `Params` the panel controls.  Composites such as
/// [crate::ksdelay::KsDelay] own one device per channel and gather both
/// before every call, so a device never sees the ports themselves.
pub trait Device<T: Float> {
    /// Per-channel input voltages
    type Input;
    /// Panel controls
    type Params;
    /// The produced sample
    type Output;
    /// Process one sample of `input` at the rate in `context`
    fn next(&mut self, context: &Context<T>, input: Self::Input, params: Self::Params) -> Self::Output;
    /// Run [Device::next] over paired input and parameter streams.  The
    /// result ends with the shorter of the two.
    fn process<'a, InputIt: Iterator<Item = Self::Input>, ParamIt: Iterator<Item = Self::Params>>(
        &'a mut self,
        context: &'a Context<T>,
        input: InputIt,
        params: ParamIt,
    ) -> DeviceIter<'a, T, Self, InputIt, ParamIt>
    where
        Self: Sized,
    {
        DeviceIter {
            dev: self,
            ctx: context,
            input,
            params,
        }
    }
}

/// The output stream of [Device::process]
pub struct DeviceIter<
    'a,
    T: Float,
    D: Device<T>,
    InputIt: Iterator<Item = D::Input>,
    ParamIt: Iterator<Item = D::Params>,
> {
    dev: &'a mut D,
    ctx: &'a Context<T>,
    input: InputIt,
    params: ParamIt,
}

impl<
        'a,
        T: Float,
        D: Device<T>,
        InputIt: Iterator<Item = D::Input>,
        ParamIt: Iterator<Item = D::Params>,
    > Iterator for DeviceIter<'a, T, D, InputIt, ParamIt>
{
    type Item = D::Output;
    fn next(&mut self) -> Option<D::Output> {
        Some(
            self.dev
                .next(self.ctx, self.input.next()?, self.params.next()?),
        )
    }
}
