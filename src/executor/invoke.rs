//! Binding a callable to a tuple of arguments.
//!
//! [`Invoke`] is implemented for every `FnOnce` taking up to eight
//! arguments, keyed on the tuple of those arguments. `f.invoke((a, b))` is
//! `f(a, b)`. Functions, closures and methods called through their path
//! (`Type::method` with the receiver as the first tuple element) all work.

/// A callable that can be invoked once with the argument tuple `Args`.
pub trait Invoke<Args>: Send + 'static {
    /// Return type of the callable.
    type Output;

    /// Calls `self` with the tuple unpacked into positional arguments.
    fn invoke(self, args: Args) -> Self::Output;
}

macro_rules! impl_invoke {
    ($($arg:ident),*) => {
        impl<Func, Out, $($arg,)*> Invoke<($($arg,)*)> for Func
        where
            Func: FnOnce($($arg),*) -> Out + Send + 'static,
        {
            type Output = Out;

            #[allow(non_snake_case)]
            #[inline]
            fn invoke(self, ($($arg,)*): ($($arg,)*)) -> Out {
                self($($arg),*)
            }
        }
    };
}

impl_invoke!();
impl_invoke!(A1);
impl_invoke!(A1, A2);
impl_invoke!(A1, A2, A3);
impl_invoke!(A1, A2, A3, A4);
impl_invoke!(A1, A2, A3, A4, A5);
impl_invoke!(A1, A2, A3, A4, A5, A6);
impl_invoke!(A1, A2, A3, A4, A5, A6, A7);
impl_invoke!(A1, A2, A3, A4, A5, A6, A7, A8);
