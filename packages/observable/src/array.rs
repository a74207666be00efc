//! Observable sequences.

use std::cell::RefCell;
use std::rc::Rc;

use crate::subscriber::{SubscriberList, Subscription};

/// Change notification delivered to [`ObservableArray`] subscribers.
#[derive(Debug, Clone)]
pub enum ArrayChange<T> {
    /// A contiguous range was removed and/or inserted at `index`.
    Splice {
        index: usize,
        added: Vec<T>,
        removed: Vec<T>,
    },
    /// A single slot was overwritten in place.
    Set {
        index: usize,
        new_value: T,
        old_value: T,
    },
    /// The entire contents were swapped out.
    Replace { new_items: Vec<T>, old_items: Vec<T> },
}

struct ArrayInner<T> {
    items: RefCell<Vec<T>>,
    subscribers: SubscriberList<ArrayChange<T>>,
}

/// An observable sequence with splice-level change notifications.
///
/// Cloning the handle shares the underlying storage.
pub struct ObservableArray<T> {
    inner: Rc<ArrayInner<T>>,
}

impl<T> Clone for ObservableArray<T> {
    fn clone(&self) -> Self {
        ObservableArray {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> ObservableArray<T> {
    pub fn new(items: Vec<T>) -> Self {
        ObservableArray {
            inner: Rc::new(ArrayInner {
                items: RefCell::new(items),
                subscribers: SubscriberList::new(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.items.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.inner.items.borrow().get(index).cloned()
    }

    /// A copy of the current contents.
    pub fn snapshot(&self) -> Vec<T> {
        self.inner.items.borrow().clone()
    }

    pub fn position(&self, mut predicate: impl FnMut(&T) -> bool) -> Option<usize> {
        self.inner.items.borrow().iter().position(|item| predicate(item))
    }

    pub fn push(&self, item: T) {
        let index = self.len();
        self.splice(index, 0, vec![item]);
    }

    pub fn insert(&self, index: usize, item: T) {
        self.splice(index, 0, vec![item]);
    }

    pub fn remove(&self, index: usize) -> Option<T> {
        if index >= self.len() {
            return None;
        }
        self.splice(index, 1, Vec::new()).into_iter().next()
    }

    /// Remove `remove_count` items at `index`, then insert `added` there.
    /// Returns the removed items.
    pub fn splice(&self, index: usize, remove_count: usize, added: Vec<T>) -> Vec<T> {
        let removed: Vec<T> = {
            let mut items = self.inner.items.borrow_mut();
            let end = (index + remove_count).min(items.len());
            let index = index.min(items.len());
            items.splice(index..end, added.iter().cloned()).collect()
        };

        if removed.is_empty() && added.is_empty() {
            return removed;
        }

        self.inner.subscribers.notify(&ArrayChange::Splice {
            index,
            added,
            removed: removed.clone(),
        });
        removed
    }

    /// Overwrite the slot at `index` in place.
    pub fn set(&self, index: usize, value: T) {
        let old_value = {
            let mut items = self.inner.items.borrow_mut();
            match items.get_mut(index) {
                Some(slot) => std::mem::replace(slot, value.clone()),
                None => return,
            }
        };

        self.inner.subscribers.notify(&ArrayChange::Set {
            index,
            new_value: value,
            old_value,
        });
    }

    /// Swap out the entire contents.
    pub fn replace_all(&self, new_items: Vec<T>) {
        let old_items = {
            let mut items = self.inner.items.borrow_mut();
            std::mem::replace(&mut *items, new_items.clone())
        };

        self.inner.subscribers.notify(&ArrayChange::Replace {
            new_items,
            old_items,
        });
    }

    pub fn clear(&self) {
        self.replace_all(Vec::new());
    }

    pub fn subscribe(&self, callback: impl Fn(&ArrayChange<T>) + 'static) -> Subscription {
        self.inner.subscribers.add(callback)
    }

    /// Whether two handles share the same underlying storage.
    pub fn ptr_eq(&self, other: &ObservableArray<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn change_log(array: &ObservableArray<i32>) -> Rc<RefCell<Vec<String>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        array
            .subscribe(move |change| {
                let entry = match change {
                    ArrayChange::Splice { index, added, removed } => {
                        format!("splice@{index} +{} -{}", added.len(), removed.len())
                    }
                    ArrayChange::Set { index, .. } => format!("set@{index}"),
                    ArrayChange::Replace { new_items, .. } => {
                        format!("replace:{}", new_items.len())
                    }
                };
                sink.borrow_mut().push(entry);
            })
            .forget();
        log
    }

    #[test]
    fn push_and_remove_report_splices() {
        let array = ObservableArray::new(vec![1, 2, 3]);
        let log = change_log(&array);

        array.push(4);
        array.remove(1);

        assert_eq!(array.snapshot(), vec![1, 3, 4]);
        assert_eq!(*log.borrow(), vec!["splice@3 +1 -0", "splice@1 +0 -1"]);
    }

    #[test]
    fn splice_removes_and_inserts() {
        let array = ObservableArray::new(vec![1, 2, 3, 4]);
        let removed = array.splice(1, 2, vec![9]);
        assert_eq!(removed, vec![2, 3]);
        assert_eq!(array.snapshot(), vec![1, 9, 4]);
    }

    #[test]
    fn set_reports_old_and_new() {
        let array = ObservableArray::new(vec![1, 2]);
        let log = change_log(&array);
        array.set(1, 7);
        assert_eq!(array.snapshot(), vec![1, 7]);
        assert_eq!(*log.borrow(), vec!["set@1"]);
    }

    #[test]
    fn replace_all_swaps_contents() {
        let array = ObservableArray::new(vec![1]);
        let log = change_log(&array);
        array.replace_all(vec![5, 6]);
        assert_eq!(array.snapshot(), vec![5, 6]);
        assert_eq!(*log.borrow(), vec!["replace:2"]);
    }

    #[test]
    fn empty_splice_is_silent() {
        let array = ObservableArray::new(vec![1]);
        let log = change_log(&array);
        array.splice(0, 0, Vec::new());
        assert!(log.borrow().is_empty());
    }
}
