#![allow(unused_macros)]

/// Generates a read accessor and a write-through setter for a fixed-offset header field.
///
/// The handle type must have an `offset: usize` field holding the file offset of the
/// structure; `$at` is the field's offset inside that structure.
macro_rules! header_field {
    ($(#[$meta:meta])* $getter:ident, $setter:ident, $ty:ty, $at:expr) => {
        $(#[$meta])*
        ///
        /// # Errors
        /// Returns [`crate::Error::OutOfBounds`] if the field lies outside the buffer.
        pub fn $getter(&self, buffer: &crate::file::RawBuffer) -> crate::Result<$ty> {
            buffer.read::<$ty>(self.offset + $at)
        }

        #[doc = concat!("Writes the `", stringify!($getter), "` field through to the buffer.")]
        ///
        /// # Errors
        /// Returns [`crate::Error::OutOfBounds`] if the field lies outside the buffer.
        pub fn $setter(&self, buffer: &mut crate::file::RawBuffer, value: $ty) -> crate::Result<()> {
            buffer.write::<$ty>(self.offset + $at, value)
        }
    };
}

/// Generates a read-only accessor for a fixed-offset header field.
macro_rules! header_getter {
    ($(#[$meta:meta])* $getter:ident, $ty:ty, $at:expr) => {
        $(#[$meta])*
        ///
        /// # Errors
        /// Returns [`crate::Error::OutOfBounds`] if the field lies outside the buffer.
        pub fn $getter(&self, buffer: &crate::file::RawBuffer) -> crate::Result<$ty> {
            buffer.read::<$ty>(self.offset + $at)
        }
    };
}

macro_rules! read_lock {
    ($rwlock:expr) => {
        $rwlock.read().map_err(|_| crate::Error::LockError)
    };
}

macro_rules! write_lock {
    ($rwlock:expr) => {
        $rwlock.write().map_err(|_| crate::Error::LockError)
    };
}
