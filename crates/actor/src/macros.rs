/// Defines an actor's state type together with a cloneable wrapper type.
///
/// Doc comments go first and are attached to the wrapper, followed by the
/// mandatory `#[wrapper_type(Name)]` attribute. Any other attributes after
/// it are attached to the state type.
///
/// The generated wrapper has private `spawn` and `handle` methods, so
/// the module defining the actor controls which messages get sent. Add
/// `impl` blocks on the wrapper to expose them.
#[macro_export]
macro_rules! define_actor {
    {
        $(#[doc = $doc:expr])*
        #[wrapper_type($wrapper_type:ident)]
        $(#[$state_attr:meta])*
        $v:vis struct $state_type:ident {
            $($state_items:tt)*
        }
    } => {
        $(#[$state_attr])*
        struct $state_type {
            $($state_items)*
        }

        $(#[doc = $doc])*
        $v struct $wrapper_type {
            handle: $crate::Actor<$state_type>,
        }

        #[allow(dead_code)]
        impl $wrapper_type {
            #[inline]
            fn spawn(state: $state_type, label: Option<&str>) -> Self {
                Self {
                    handle: $crate::Actor::spawn(state, label),
                }
            }

            #[inline]
            fn handle(&self) -> &$crate::Actor<$state_type> {
                &self.handle
            }
        }

        impl Clone for $wrapper_type {
            #[inline]
            fn clone(&self) -> Self {
                Self {
                    handle: self.handle.clone(),
                }
            }
        }
    };
}
