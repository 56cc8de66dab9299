//! The `function_table!` declaration macro.

/// Declares a function table: a struct of optional `extern "C"` function
/// pointers, a `PFN_<name>` type alias per function, and a
/// [`FunctionTable`](crate::FunctionTable) impl listing each slot's policy.
///
/// ```
/// use keel_loader::function_table;
/// use keel_core::PlatformType;
///
/// function_table! {
///     /// Core entry points of a compression library.
///     pub struct ZstdFunctions {
///         fn ZSTD_versionNumber() -> u32;
///         #[bind(alt_names = &["ZSTD_compressBound_v1"])]
///         fn ZSTD_compressBound(src_size: usize) -> usize;
///         #[bind(relaxed)]
///         fn ZSTD_trace(level: i32);
///         #[bind(relaxed, platform = PlatformType::Windows)]
///         fn ZSTD_win32_only();
///     }
/// }
///
/// let table = ZstdFunctions::default();
/// assert!(table.ZSTD_versionNumber.is_none());
/// let _: Option<PFN_ZSTD_compressBound> = table.ZSTD_compressBound;
/// ```
///
/// Policy keys inside `#[bind(...)]` are the builder methods of
/// [`ExternDecl`](crate::ExternDecl): `relaxed`, `manual`,
/// `alt_names = &[..]`, `platform = ..`, `sub_platform = ..`.
#[macro_export]
macro_rules! function_table {
    (
        $(#[$meta:meta])*
        $vis:vis struct $table:ident {
            $(
                $(#[bind($($key:ident $(= $value:expr)?),* $(,)?)])?
                fn $func:ident($($arg:ident : $argty:ty),* $(,)?) $(-> $ret:ty)?;
            )*
        }
    ) => {
        $crate::__private::paste! {
            $(
                #[allow(non_camel_case_types)]
                #[doc = concat!("Signature of `", stringify!($func), "`.")]
                $vis type [<PFN_ $func>] = unsafe extern "C" fn($($argty),*) $(-> $ret)?;
            )*

            $(#[$meta])*
            #[allow(non_snake_case)]
            #[derive(Clone, Copy, Debug, Default)]
            $vis struct $table {
                $(
                    #[doc = concat!("`", stringify!($func), "`, if bound.")]
                    pub $func: ::core::option::Option<[<PFN_ $func>]>,
                )*
            }

            impl $crate::FunctionTable for $table {
                const NAME: &'static str = stringify!($table);

                const DECLARATIONS: &'static [$crate::ExternDecl] = &[
                    $(
                        $crate::ExternDecl::new(stringify!($func))
                            $($( .$key($($value)?) )*)?
                    ),*
                ];

                #[allow(unsafe_code)]
                unsafe fn set_slot(
                    &mut self,
                    field: &str,
                    address: ::core::option::Option<::core::ptr::NonNull<::core::ffi::c_void>>,
                ) -> bool {
                    match field {
                        $(
                            stringify!($func) => {
                                // SAFETY: the caller guarantees the export has
                                // this slot's signature.
                                self.$func = address.map(|a| unsafe {
                                    ::core::mem::transmute::<
                                        *mut ::core::ffi::c_void,
                                        [<PFN_ $func>],
                                    >(a.as_ptr())
                                });
                                true
                            }
                        )*
                        _ => false,
                    }
                }
            }
        }
    };
}
