use itertools::Itertools;

#[derive(Debug)]
struct Chunk {
    start_id: u32,
    start_index: usize,
}

#[derive(Debug)]
pub struct SparseVec<T: Chunkable> {
    chunks: Vec<Chunk>,
    items: Vec<T>,
}

impl<T: Chunkable> Default for SparseVec<T> {
    fn default() -> Self {
        Self {
            chunks: Vec::new(),
            items: Vec::new(),
        }
    }
}

impl<T: Chunkable> SparseVec<T> {
    fn get_item_index(&self, id: u32) -> Option<usize> {
        match self.chunks.binary_search_by(|x| x.start_id.cmp(&id)) {
            Ok(x) => Some(self.chunks[x].start_index),
            Err(x) => {
                if x > 0 {
                    let chunk = &self.chunks[x - 1];
                    Some(chunk.start_index + (id - chunk.start_id) as usize)
                } else {
                    None
                }
            }
        }
    }

    pub fn get(&self, id: u32) -> Option<&T> {
        let index = self.get_item_index(id)?;
        let candidate = self.items.get(index)?;
        if candidate.get_id() == id { Some(candidate) } else { None }
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut T> {
        let index = self.get_item_index(id)?;
        let candidate = self.items.get_mut(index)?;
        if candidate.get_id() == id { Some(candidate) } else { None }
    }

    pub fn contains(&self, id: u32) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T: Chunkable> FromIterator<T> for SparseVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let items: Vec<T> = iter.into_iter().sorted_by_key(|item| item.get_id()).collect();
        let Some(first) = items.first() else {
            return Self::default();
        };

        let mut chunks: Vec<Chunk> = vec![Chunk {
            start_id: first.get_id(),
            start_index: 0,
        }];
        chunks.extend(
            items
                .iter()
                .map(|x| x.get_id())
                .enumerate()
                .tuple_windows()
                .filter(|(a, b)| b.1 - a.1 != 1)
                .map(|(_, b)| Chunk {
                    start_id: b.1,
                    start_index: b.0,
                }),
        );

        Self { chunks, items }
    }
}

impl<'a, T: Chunkable> IntoIterator for &'a SparseVec<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub trait Chunkable {
    fn get_id(&self) -> u32;
}

#[cfg(test)]
mod tests {
    use super::*;

    impl PartialEq<(u32, usize)> for Chunk {
        fn eq(&self, (start_id, start_index): &(u32, usize)) -> bool {
            self.start_id == *start_id && self.start_index == *start_index
        }
    }

    #[derive(Debug)]
    struct TestItem {
        id: u32,
    }

    impl Chunkable for TestItem {
        fn get_id(&self) -> u32 {
            self.id
        }
    }

    #[test]
    fn test_sparse_vec() {
        let ids = [10, 1, 2, 3, 4, 5, 6, 7, 8, 9];
        let sparse_vec: SparseVec<TestItem> = ids.into_iter().map(|id| TestItem { id }).collect();
        assert_eq!(sparse_vec.len(), 10);
        assert_eq!(sparse_vec.chunks.len(), 1);
        assert_eq!(sparse_vec.chunks[0], (1, 0));
        assert_eq!(sparse_vec.iter().map(|x| x.id).collect_vec(), (1..=10).collect_vec());

        let test_ids = [Ok(3), Ok(1), Ok(10), Err(0), Err(11)];
        for test in test_ids.into_iter() {
            match test {
                Ok(id) => assert_eq!(sparse_vec.get(id).unwrap().id, id),
                Err(id) => assert!(!sparse_vec.contains(id)),
            }
        }
    }

    #[test]
    fn test_sparse_vec_with_gaps() {
        let ids = [1, 2, 3, 50, 51, 52, 65, 70, 100, 101];
        let mut sparse_vec: SparseVec<TestItem> = ids.into_iter().map(|id| TestItem { id }).collect();
        assert_eq!(sparse_vec.chunks.len(), 5);
        assert_eq!(sparse_vec.chunks[1], (50, 3));
        assert_eq!(sparse_vec.chunks[4], (100, 8));

        assert_eq!(sparse_vec.get(65).unwrap().id, 65);
        assert!(sparse_vec.get(69).is_none());
        assert!(sparse_vec.get(102).is_none());
        sparse_vec.get_mut(70).unwrap().id = 70;
        assert!(sparse_vec.get_mut(4).is_none());
    }

    #[test]
    fn test_empty_sparse_vec() {
        let sparse_vec: SparseVec<TestItem> = std::iter::empty().collect();
        assert!(sparse_vec.is_empty());
        assert!(sparse_vec.get(1).is_none());
    }
}
