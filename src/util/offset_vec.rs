use std::fmt::{Debug, Error, Formatter};

/// Number of offsets an element takes up in an [`OffsetVec`]
pub trait Width {
    fn width(&self) -> usize;
}

/// Offset into an [`OffsetVec`]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Offset(pub usize);

/// Elements addressed by offset instead of by position
///
/// The offset of an element is the starting offset plus the widths of all elements before it.
/// This is the layout of the constant pool, where slots count from 1 and `Long` and `Double`
/// entries each take two slots.
#[derive(Clone)]
pub struct OffsetVec<T> {
    /// Offset of the first element (and of the next element while empty)
    start: Offset,

    /// Offset of each element, strictly increasing
    offsets: Vec<Offset>,

    elements: Vec<T>,
}

/// Where an offset lands
enum Location {
    /// First slot of the element at this position
    Start(usize),

    /// Inside an element, which starts before the offset
    Inside(usize),

    /// Before the first element or after the last one
    Outside,
}

impl<T: Width> OffsetVec<T> {
    pub fn new_starting_at(start: Offset) -> OffsetVec<T> {
        OffsetVec {
            start,
            offsets: vec![],
            elements: vec![],
        }
    }

    /// Offset the next pushed element would get
    pub fn offset_len(&self) -> Offset {
        match (self.offsets.last(), self.elements.last()) {
            (Some(Offset(last)), Some(element)) => Offset(last + element.width()),
            _ => self.start,
        }
    }

    pub fn push(&mut self, element: T) -> Offset {
        let offset = self.offset_len();
        self.offsets.push(offset);
        self.elements.push(element);
        offset
    }

    fn locate(&self, offset: Offset) -> Location {
        if offset >= self.offset_len() {
            return Location::Outside;
        }
        match self.offsets.binary_search(&offset) {
            Ok(position) => Location::Start(position),
            Err(0) => Location::Outside,
            Err(after) => Location::Inside(after - 1),
        }
    }

    pub fn get_offset(&self, offset: Offset) -> OffsetResult<'_, T> {
        match self.locate(offset) {
            Location::Start(position) => OffsetResult::Ok(position, &self.elements[position]),
            Location::Inside(position) => OffsetResult::InvalidOffset(position),
            Location::Outside => OffsetResult::TooLarge,
        }
    }

    /// Swap out the element starting at `offset`
    ///
    /// The replacement must be exactly as wide as the element it replaces.
    pub fn replace_offset(&mut self, offset: Offset, element: T) -> OffsetResult<'static, T> {
        let position = match self.locate(offset) {
            Location::Start(position) => position,
            Location::Inside(position) => return OffsetResult::InvalidOffset(position),
            Location::Outside => return OffsetResult::TooLarge,
        };
        let (new_width, old_width) = (element.width(), self.elements[position].width());
        if new_width != old_width {
            return OffsetResult::IncompatibleWidth(new_width, old_width);
        }
        let previous = std::mem::replace(&mut self.elements[position], element);
        OffsetResult::Replaced(position, previous)
    }

    /// Elements in order, along with their offsets
    pub fn iter(&self) -> impl Iterator<Item = (Offset, &T)> + '_ {
        self.offsets.iter().copied().zip(self.elements.iter())
    }
}

/// Outcome of addressing an [`OffsetVec`] by offset
#[derive(Debug)]
pub enum OffsetResult<'a, T> {
    /// Element at this position
    Ok(usize, &'a T),

    /// Element at this position was replaced, and this is what used to be there
    Replaced(usize, T),

    /// Offset falls in the middle of the element at this position
    InvalidOffset(usize),

    /// Replacement width does not match (replacement width, existing width)
    IncompatibleWidth(usize, usize),

    /// No element starts at or covers the offset
    TooLarge,
}

impl<'a, T> OffsetResult<'a, T> {
    pub fn ok(self) -> Option<&'a T> {
        match self {
            OffsetResult::Ok(_, found) => Some(found),
            OffsetResult::Replaced(_, _)
            | OffsetResult::InvalidOffset(_)
            | OffsetResult::IncompatibleWidth(_, _)
            | OffsetResult::TooLarge => None,
        }
    }
}

impl<T: Debug> Debug for OffsetVec<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        let entries = self.offsets.iter().zip(self.elements.iter());
        f.debug_map()
            .entries(entries.map(|(Offset(offset), element)| (offset, element)))
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Copy, Clone, Eq, PartialEq, Debug)]
    enum Slot {
        Narrow(u8),
        Wide(u8),
    }

    impl Width for Slot {
        fn width(&self) -> usize {
            match self {
                Slot::Narrow(_) => 1,
                Slot::Wide(_) => 2,
            }
        }
    }

    fn slots() -> OffsetVec<Slot> {
        let mut slots = OffsetVec::new_starting_at(Offset(1));
        assert_eq!(slots.push(Slot::Narrow(1)), Offset(1));
        assert_eq!(slots.push(Slot::Wide(2)), Offset(2));
        assert_eq!(slots.push(Slot::Narrow(3)), Offset(4));
        slots
    }

    #[test]
    fn wide_elements_take_two_offsets() {
        let slots = slots();
        assert_eq!(slots.offset_len(), Offset(5));
        assert_eq!(
            slots.iter().map(|(offset, slot)| (offset.0, *slot)).collect::<Vec<_>>(),
            vec![(1, Slot::Narrow(1)), (2, Slot::Wide(2)), (4, Slot::Narrow(3))]
        );

        assert_eq!(slots.get_offset(Offset(4)).ok(), Some(&Slot::Narrow(3)));
        assert!(matches!(slots.get_offset(Offset(3)), OffsetResult::InvalidOffset(1)));
        assert!(matches!(slots.get_offset(Offset(0)), OffsetResult::TooLarge));
        assert!(matches!(slots.get_offset(Offset(5)), OffsetResult::TooLarge));
    }

    #[test]
    fn replacing_keeps_offsets_stable() {
        let mut slots = slots();
        assert!(matches!(
            slots.replace_offset(Offset(1), Slot::Narrow(7)),
            OffsetResult::Replaced(0, Slot::Narrow(1))
        ));
        assert!(matches!(
            slots.replace_offset(Offset(2), Slot::Narrow(8)),
            OffsetResult::IncompatibleWidth(1, 2)
        ));
        assert!(matches!(
            slots.replace_offset(Offset(3), Slot::Narrow(8)),
            OffsetResult::InvalidOffset(1)
        ));
        assert_eq!(slots.get_offset(Offset(1)).ok(), Some(&Slot::Narrow(7)));
        assert_eq!(slots.get_offset(Offset(4)).ok(), Some(&Slot::Narrow(3)));
        assert_eq!(slots.offset_len(), Offset(5));
    }
}
