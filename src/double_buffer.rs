/*
 * Double Buffer Module
 *
 * Two slots with the roles "current" and "next". Readers get the current
 * slot, the single writer gets the next slot, and `swap` flips the roles at
 * the frame boundary. Because `split_mut` hands out `&T` and `&mut T` to
 * different slots, the borrow checker rules out a reader and a writer ever
 * touching the same slot.
 */

#[derive(Debug, Clone)]
pub struct DoubleBuffer<T> {
    slots: [T; 2],
    current: usize,
}

impl<T> DoubleBuffer<T> {
    pub fn new(current: T, next: T) -> Self {
        Self {
            slots: [current, next],
            current: 0,
        }
    }

    #[inline]
    pub fn current(&self) -> &T {
        &self.slots[self.current]
    }

    #[inline]
    pub fn next(&self) -> &T {
        &self.slots[1 - self.current]
    }

    #[inline]
    pub fn next_mut(&mut self) -> &mut T {
        &mut self.slots[1 - self.current]
    }

    /// Read access to current and write access to next at the same time.
    pub fn split_mut(&mut self) -> (&T, &mut T) {
        let (first, second) = self.slots.split_at_mut(1);
        if self.current == 0 {
            (&first[0], &mut second[0])
        } else {
            (&second[0], &mut first[0])
        }
    }

    /// Next becomes current and the old current becomes next.
    pub fn swap(&mut self) {
        self.current = 1 - self.current;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_exchanges_roles() {
        let mut buffers = DoubleBuffer::new("a", "b");
        assert_eq!(*buffers.current(), "a");
        assert_eq!(*buffers.next(), "b");

        buffers.swap();
        assert_eq!(*buffers.current(), "b");
        assert_eq!(*buffers.next(), "a");

        buffers.swap();
        assert_eq!(*buffers.current(), "a");
    }

    #[test]
    fn split_mut_writes_only_next() {
        let mut buffers = DoubleBuffer::new(vec![1], Vec::new());
        {
            let (current, next) = buffers.split_mut();
            next.extend(current.iter().map(|v| v * 10));
        }
        assert_eq!(buffers.current(), &vec![1]);
        assert_eq!(buffers.next(), &vec![10]);

        buffers.swap();
        buffers.next_mut().clear();
        let (current, next) = buffers.split_mut();
        assert_eq!(current, &vec![10]);
        assert!(next.is_empty());
    }
}
