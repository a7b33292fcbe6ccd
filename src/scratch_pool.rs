//! Pre-allocated output cells handed to native calls as out-parameters.
//!
//! Every native entry point writes its scalar results into caller-supplied
//! cells. A session owns one [`ScratchPool`] sized for the richest operation of
//! its device family, so no call allocates for its scalar outputs. A cell's
//! content is only meaningful between the call that wrote it and the read that
//! immediately follows.

use std::fmt;

use crate::error::{Result, SpectroError};

/// Primitive kind of a scratch cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    Byte,
    Short,
    Int,
    Float,
    Double,
    Pointer,
}

impl CellKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CellKind::Byte => "byte",
            CellKind::Short => "short",
            CellKind::Int => "int32",
            CellKind::Float => "float32",
            CellKind::Double => "float64",
            CellKind::Pointer => "pointer",
        }
    }
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of cells per kind, fixed once per device family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScratchLayout {
    pub bytes: usize,
    pub shorts: usize,
    pub ints: usize,
    pub floats: usize,
    pub doubles: usize,
    pub pointers: usize,
}

impl ScratchLayout {
    pub const fn new(
        bytes: usize,
        shorts: usize,
        ints: usize,
        floats: usize,
        doubles: usize,
        pointers: usize,
    ) -> Self {
        Self {
            bytes,
            shorts,
            ints,
            floats,
            doubles,
            pointers,
        }
    }

    pub fn count(&self, kind: CellKind) -> usize {
        match kind {
            CellKind::Byte => self.bytes,
            CellKind::Short => self.shorts,
            CellKind::Int => self.ints,
            CellKind::Float => self.floats,
            CellKind::Double => self.doubles,
            CellKind::Pointer => self.pointers,
        }
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for i16 {}
    impl Sealed for i32 {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
    impl Sealed for usize {}
}

/// A primitive that has its own cell array in the pool.
pub trait ScratchCell: Copy + Default + sealed::Sealed {
    const KIND: CellKind;

    fn slots(pool: &ScratchPool) -> &[Self];
    fn slots_mut(pool: &mut ScratchPool) -> &mut [Self];
}

macro_rules! scratch_cell {
    ($ty:ty, $kind:ident, $field:ident) => {
        impl ScratchCell for $ty {
            const KIND: CellKind = CellKind::$kind;

            fn slots(pool: &ScratchPool) -> &[Self] {
                &pool.$field
            }

            fn slots_mut(pool: &mut ScratchPool) -> &mut [Self] {
                &mut pool.$field
            }
        }
    };
}

scratch_cell!(u8, Byte, bytes);
scratch_cell!(i16, Short, shorts);
scratch_cell!(i32, Int, ints);
scratch_cell!(f32, Float, floats);
scratch_cell!(f64, Double, doubles);
scratch_cell!(usize, Pointer, pointers);

#[derive(Debug)]
pub struct ScratchPool {
    layout: ScratchLayout,
    bytes: Box<[u8]>,
    shorts: Box<[i16]>,
    ints: Box<[i32]>,
    floats: Box<[f32]>,
    doubles: Box<[f64]>,
    pointers: Box<[usize]>,
}

/// Disjoint views of every cell array, for native calls that write several kinds at once.
pub struct ScratchCells<'a> {
    pub bytes: &'a mut [u8],
    pub shorts: &'a mut [i16],
    pub ints: &'a mut [i32],
    pub floats: &'a mut [f32],
    pub doubles: &'a mut [f64],
    pub pointers: &'a mut [usize],
}

/// Borrow the first `N` cells of one kind as a fixed-size array.
pub fn take_cells<'a, T: ScratchCell, const N: usize>(
    slots: &'a mut [T],
    operation: &'static str,
) -> Result<&'a mut [T; N]> {
    let available = slots.len();
    slots
        .get_mut(..N)
        .and_then(|cells| <&mut [T; N]>::try_from(cells).ok())
        .ok_or(SpectroError::ScratchExhausted {
            operation,
            kind: T::KIND,
            needed: N,
            available,
        })
}

impl ScratchPool {
    pub fn new(layout: ScratchLayout) -> Self {
        log::trace!("Allocating scratch pool {:?}", layout);
        Self {
            layout,
            bytes: vec![0; layout.bytes].into_boxed_slice(),
            shorts: vec![0; layout.shorts].into_boxed_slice(),
            ints: vec![0; layout.ints].into_boxed_slice(),
            floats: vec![0.0; layout.floats].into_boxed_slice(),
            doubles: vec![0.0; layout.doubles].into_boxed_slice(),
            pointers: vec![0; layout.pointers].into_boxed_slice(),
        }
    }

    pub fn layout(&self) -> ScratchLayout {
        self.layout
    }

    pub fn capacity<T: ScratchCell>(&self) -> usize {
        T::slots(self).len()
    }

    /// Mutable access to one pre-existing cell. Never allocates.
    pub fn get<T: ScratchCell>(&mut self, index: usize) -> Option<&mut T> {
        T::slots_mut(self).get_mut(index)
    }

    /// The first `N` cells of kind `T`, ready to be passed as out-parameters.
    pub fn cells<T: ScratchCell, const N: usize>(
        &mut self,
        operation: &'static str,
    ) -> Result<&mut [T; N]> {
        take_cells(T::slots_mut(self), operation)
    }

    /// Copy the first `N` cells of kind `T` out of the pool.
    pub fn values<T: ScratchCell, const N: usize>(&self, operation: &'static str) -> Result<[T; N]> {
        let slots = T::slots(self);
        slots
            .get(..N)
            .and_then(|cells| <[T; N]>::try_from(cells).ok())
            .ok_or(SpectroError::ScratchExhausted {
                operation,
                kind: T::KIND,
                needed: N,
                available: slots.len(),
            })
    }

    pub fn split(&mut self) -> ScratchCells<'_> {
        ScratchCells {
            bytes: &mut self.bytes,
            shorts: &mut self.shorts,
            ints: &mut self.ints,
            floats: &mut self.floats,
            doubles: &mut self.doubles,
            pointers: &mut self.pointers,
        }
    }

    /// Reset every cell so stale output from a failed call cannot be read back.
    pub fn discard(&mut self) {
        self.bytes.fill(0);
        self.shorts.fill(0);
        self.ints.fill(0);
        self.floats.fill(0.0);
        self.doubles.fill(0.0);
        self.pointers.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT: ScratchLayout = ScratchLayout::new(2, 1, 8, 8, 4, 1);

    #[test]
    fn test_pool_is_sized_from_layout() {
        let pool = ScratchPool::new(LAYOUT);
        assert_eq!(pool.capacity::<u8>(), 2);
        assert_eq!(pool.capacity::<i16>(), 1);
        assert_eq!(pool.capacity::<i32>(), 8);
        assert_eq!(pool.capacity::<f32>(), 8);
        assert_eq!(pool.capacity::<f64>(), 4);
        assert_eq!(pool.capacity::<usize>(), 1);
        assert_eq!(pool.layout().count(CellKind::Int), 8);
    }

    #[test]
    fn test_cells_are_reused_not_reallocated() {
        let mut pool = ScratchPool::new(LAYOUT);
        let before = pool.get::<f32>(3).map(|cell| cell as *mut f32);

        if let Some(cell) = pool.get::<f32>(3) {
            *cell = 12.5;
        }
        assert_eq!(pool.values::<f32, 4>("read").unwrap()[3], 12.5);

        if let Some(cell) = pool.get::<f32>(3) {
            *cell = 1.0;
        }
        let after = pool.get::<f32>(3).map(|cell| cell as *mut f32);
        assert_eq!(before, after);
        assert_eq!(pool.values::<f32, 4>("read").unwrap()[3], 1.0);
    }

    #[test]
    fn test_out_of_range_access() {
        let mut pool = ScratchPool::new(LAYOUT);
        assert!(pool.get::<i16>(1).is_none());

        let err = pool.cells::<f64, 5>("chromaticity").unwrap_err();
        assert!(matches!(
            err,
            SpectroError::ScratchExhausted {
                kind: CellKind::Double,
                needed: 5,
                available: 4,
                ..
            }
        ));
    }

    #[test]
    fn test_split_gives_disjoint_cells() {
        let mut pool = ScratchPool::new(LAYOUT);
        {
            let cells = pool.split();
            let [flag, done] = take_cells::<u8, 2>(cells.bytes, "adapt").unwrap();
            let [time] = take_cells::<f32, 1>(cells.floats, "adapt").unwrap();
            let [count] = take_cells::<i32, 1>(cells.ints, "adapt").unwrap();
            *flag = 1;
            *done = 1;
            *time = 250.0;
            *count = 4;
        }
        assert_eq!(pool.values::<u8, 2>("adapt").unwrap(), [1, 1]);
        assert_eq!(pool.values::<f32, 1>("adapt").unwrap(), [250.0]);
        assert_eq!(pool.values::<i32, 1>("adapt").unwrap(), [4]);

        pool.discard();
        assert_eq!(pool.values::<u8, 2>("adapt").unwrap(), [0, 0]);
        assert_eq!(pool.values::<f32, 1>("adapt").unwrap(), [0.0]);
    }
}
