//! Intrusive doubly-linked list with free-link recycling.
//!
//! This is the crate's `LinkedList` / `LinkStore` collaborator: an
//! allocation-light doubly-linked list used as the LRU spine inside
//! [`BoundedCache`](crate::cache::BoundedCache). Two sentinel ("sigil")
//! nodes anchor the head and tail so every splice is branch-free, and nodes
//! released by `remove`/eviction are kept on a free chain (the "LinkStore")
//! rather than deallocated immediately — the next `add` reuses one of those
//! allocations before falling back to the global allocator.
//!
//! **Note**: this module is internal infrastructure and should not be used
//! directly by library consumers. It exposes unsafe raw-pointer operations
//! that require careful invariant maintenance; use [`BoundedCache`](crate::cache::BoundedCache)
//! instead.

extern crate alloc;

use alloc::boxed::Box;
use alloc::fmt;
use core::mem;
use core::num::NonZeroUsize;
use core::ptr::{self, NonNull};

/// A node in the doubly linked list.
///
/// Contains a value and pointers to the previous and next entries. Not
/// meant to be used directly by users of [`LinkList`].
pub struct Link<T> {
    /// The value stored in this link. `MaybeUninit` lets sigil nodes and
    /// free-chain nodes exist without a live `T`.
    val: mem::MaybeUninit<T>,
    /// Pointer to the previous entry in the list, or the next free node
    /// while this link sits on the free chain.
    prev: *mut Link<T>,
    /// Pointer to the next entry in the list (or on the free chain).
    next: *mut Link<T>,
}

impl<T> Link<T> {
    /// Creates a new link with the given value.
    fn new(val: T) -> Self {
        Link {
            val: mem::MaybeUninit::new(val),
            prev: ptr::null_mut(),
            next: ptr::null_mut(),
        }
    }

    /// Creates a new sigil (sentinel) link without initializing the value.
    ///
    /// Sigil links are used as head and tail markers in the list.
    fn new_sigil() -> Self {
        Link {
            val: mem::MaybeUninit::uninit(),
            prev: ptr::null_mut(),
            next: ptr::null_mut(),
        }
    }

    /// Safely extracts the value from this link.
    ///
    /// # Safety
    ///
    /// Assumes the value is initialized. Only call on attached, non-sigil
    /// nodes.
    pub unsafe fn get_value(&self) -> &T {
        unsafe { self.val.assume_init_ref() }
    }

    /// Safely extracts a mutable reference to the value from this link.
    ///
    /// # Safety
    ///
    /// Assumes the value is initialized. Only call on attached, non-sigil
    /// nodes.
    pub unsafe fn get_value_mut(&mut self) -> &mut T {
        unsafe { self.val.assume_init_mut() }
    }
}

/// A doubly linked list implementation with fixed capacity and free-link
/// recycling.
///
/// This list maintains a fixed capacity specified at creation time and
/// provides O(1) operations for adding, removing, and updating elements.
/// Sentinel nodes (sigils) at the head and tail simplify every splice.
/// Detached nodes are pushed onto an internal free chain instead of being
/// deallocated; `add` pops from that chain first.
pub struct LinkList<T> {
    /// Maximum number of items the list can hold.
    cap: NonZeroUsize,
    /// Current number of items in the list.
    len: usize,
    /// Pointer to the head sentinel node.
    head: *mut Link<T>,
    /// Pointer to the tail sentinel node.
    tail: *mut Link<T>,
    /// Singly-linked chain of detached, deallocation-deferred nodes,
    /// threaded through `next`. Reused by `add`/`add_unchecked` before a
    /// fresh allocation is made.
    free: *mut Link<T>,
    /// Number of nodes currently parked on `free`.
    free_len: usize,
}

impl<T> LinkList<T> {
    /// Creates a new `LinkList` that holds at most `cap` items.
    pub fn new(cap: NonZeroUsize) -> LinkList<T> {
        LinkList::construct(cap)
    }
}

impl<T> LinkList<T> {
    /// Creates a new list with the given capacity, wiring up the sentinels.
    fn construct(cap: NonZeroUsize) -> LinkList<T> {
        let head = Box::into_raw(Box::new(Link::new_sigil()));
        let tail = Box::into_raw(Box::new(Link::new_sigil()));

        let list = LinkList {
            cap,
            len: 0,
            head,
            tail,
            free: ptr::null_mut(),
            free_len: 0,
        };

        unsafe {
            // SAFETY: head and tail are newly allocated and valid pointers
            (*list.head).next = list.tail;
            (*list.tail).prev = list.head;
        }

        list
    }

    /// Returns the maximum number of items the list can hold.
    pub fn cap(&self) -> NonZeroUsize {
        self.cap
    }

    /// Returns the current number of items in the list.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the list contains no items.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if the list is at capacity.
    pub fn is_full(&self) -> bool {
        self.len == self.cap.get()
    }

    /// Returns the number of links currently parked on the free chain.
    pub fn free_len(&self) -> usize {
        self.free_len
    }

    /// Pushes a detached, value-drained link onto the free chain.
    ///
    /// # Safety
    ///
    /// `node` must not be null and must not currently be attached to any
    /// list (this list or another).
    unsafe fn push_free(&mut self, node: *mut Link<T>) {
        unsafe {
            (*node).next = self.free;
            (*node).prev = ptr::null_mut();
        }
        self.free = node;
        self.free_len += 1;
    }

    /// Pops a link off the free chain, if any.
    fn pop_free(&mut self) -> Option<*mut Link<T>> {
        if self.free.is_null() {
            return None;
        }
        let node = self.free;
        // SAFETY: node came from push_free, which always leaves a valid,
        // non-dangling pointer in `self.free`.
        self.free = unsafe { (*node).next };
        self.free_len -= 1;
        Some(node)
    }

    /// Removes the first (most recently added) item from the list, keeping
    /// its link on the free chain for reuse.
    pub fn remove_first(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        // SAFETY: head/tail are valid sentinels and the list is non-empty.
        let next = unsafe { (*self.head).next };
        if next != self.tail {
            unsafe { self._detach(next) };
            self.len -= 1;
            // SAFETY: next was attached and non-sigil, so its value is init.
            let value = unsafe { (*next).val.assume_init_read() };
            // SAFETY: next is now fully detached and value-drained.
            unsafe { self.push_free(next) };
            Some(value)
        } else {
            None
        }
    }

    /// Removes the last (least recently added) item from the list, keeping
    /// its link on the free chain for reuse.
    pub fn remove_last(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        // SAFETY: head/tail are valid sentinels and the list is non-empty.
        let prev = unsafe { (*self.tail).prev };
        if prev != self.head {
            unsafe { self._detach(prev) };
            self.len -= 1;
            // SAFETY: prev was attached and non-sigil, so its value is init.
            let value = unsafe { (*prev).val.assume_init_read() };
            // SAFETY: prev is now fully detached and value-drained.
            unsafe { self.push_free(prev) };
            Some(value)
        } else {
            None
        }
    }

    /// Detaches an arbitrary node from the list, returning its value and
    /// parking the link on the free chain.
    ///
    /// # Safety
    ///
    /// `node` must be a valid, non-null, non-sigil pointer currently
    /// attached to this list.
    pub unsafe fn remove(&mut self, node: *mut Link<T>) -> Option<T> {
        if self.is_empty() || node.is_null() || node == self.head || node == self.tail {
            return None;
        }

        unsafe {
            self._detach(node);
            self.len -= 1;
            let value = (*node).val.assume_init_read();
            self.push_free(node);
            Some(value)
        }
    }

    /// Detaches a node from the list without draining its value or
    /// deallocating it.
    ///
    /// # Safety
    ///
    /// `node` must be a valid pointer to a node currently part of this
    /// list (not null, not freed).
    unsafe fn _detach(&mut self, node: *mut Link<T>) {
        // SAFETY: caller guarantees node is attached, so prev/next are valid.
        unsafe {
            (*(*node).prev).next = (*node).next;
            (*(*node).next).prev = (*node).prev;
        }
    }

    /// Attaches a node after the head sentinel node (front of list).
    ///
    /// # Safety
    ///
    /// `node` must be valid and not already attached to any list.
    pub unsafe fn attach(&mut self, node: *mut Link<T>) {
        unsafe {
            (*node).next = (*self.head).next;
            (*node).prev = self.head;
            (*self.head).next = node;
            (*(*node).next).prev = node;
        }
    }

    /// Attaches a node before the tail sentinel node (back of list).
    ///
    /// # Safety
    ///
    /// `node` must be valid and not already attached to any list.
    pub unsafe fn attach_last(&mut self, node: *mut Link<T>) {
        unsafe {
            (*node).next = self.tail;
            (*node).prev = (*self.tail).prev;
            (*self.tail).prev = node;
            (*(*node).prev).next = node;
        }
    }

    /// Attaches a node detached from another list after the head sentinel,
    /// incrementing this list's length.
    ///
    /// # Safety
    ///
    /// `node` must be valid and not already attached to any list.
    pub unsafe fn attach_from_other_list(&mut self, node: *mut Link<T>) {
        unsafe { self.attach(node) };
        self.len += 1;
    }

    /// Moves a node already in this list to the front (after the head
    /// sentinel). A no-op if `node` is already the front item.
    ///
    /// # Safety
    ///
    /// `node` must point to a valid entry currently attached to this list.
    pub unsafe fn move_to_front(&mut self, node: *mut Link<T>) {
        if node.is_null() || node == self.head || node == self.tail {
            return;
        }
        unsafe {
            if (*self.head).next == node {
                return;
            }
            self._detach(node);
            self.attach(node);
        }
    }

    /// Adds a value to the front of the list, reusing a free-chain link
    /// when one is available.
    ///
    /// Returns a pointer to the new entry, or `None` if the list is full.
    pub fn add(&mut self, v: T) -> Option<*mut Link<T>> {
        if self.len == self.cap().get() {
            return None;
        }
        Some(self.add_unchecked(v))
    }

    /// Adds a value to the front of the list, bypassing the capacity
    /// check. Callers that rely on this must enforce the cache-level
    /// budget another way.
    pub fn add_unchecked(&mut self, v: T) -> *mut Link<T> {
        let node = match self.pop_free() {
            Some(node) => {
                // SAFETY: node came off the free chain: detached, value-drained.
                unsafe {
                    (*node).val = mem::MaybeUninit::new(v);
                    (*node).prev = ptr::null_mut();
                    (*node).next = ptr::null_mut();
                }
                node
            }
            None => {
                // SAFETY: Box::into_raw always yields a non-null pointer.
                unsafe { NonNull::new_unchecked(Box::into_raw(Box::new(Link::new(v)))).as_ptr() }
            }
        };
        // SAFETY: node is freshly populated and not attached to any list.
        unsafe { self.attach(node) };
        self.len += 1;
        node
    }

    /// Updates the value of the given node, optionally capturing the old
    /// value.
    ///
    /// # Safety
    ///
    /// `node` must be valid and point to an attached, non-sigil entry.
    pub unsafe fn update(&mut self, node: *mut Link<T>, v: T, capturing: bool) -> (Option<T>, bool) {
        if node.is_null() {
            return (None, false);
        }
        let old_val =
            unsafe { mem::replace(&mut (*node).val, mem::MaybeUninit::new(v)).assume_init() };
        if capturing {
            (Some(old_val), true)
        } else {
            (None, true)
        }
    }

    /// Gets an immutable reference to the value stored in the entry.
    ///
    /// # Safety
    ///
    /// `node` must be valid and point to an attached, non-sigil entry.
    pub unsafe fn get_value(&self, node: *mut Link<T>) -> Option<&T> {
        if node.is_null() || node == self.head || node == self.tail {
            None
        } else {
            Some(unsafe { (*node).get_value() })
        }
    }

    /// Gets a mutable reference to the value stored in the entry.
    ///
    /// # Safety
    ///
    /// `node` must be valid and point to an attached, non-sigil entry.
    pub unsafe fn get_value_mut(&mut self, node: *mut Link<T>) -> Option<&mut T> {
        if node.is_null() || node == self.head || node == self.tail {
            None
        } else {
            Some(unsafe { (*node).get_value_mut() })
        }
    }

    /// Clears the list, removing all entries (links are parked on the free
    /// chain, not deallocated).
    pub fn clear(&mut self) {
        while self.remove_first().is_some() {}
    }

    /// Drops every link on the free chain, returning its memory to the
    /// allocator. Useful for callers that want to bound memory held by an
    /// idle list; ordinary operation never needs this.
    pub fn shrink_free(&mut self) {
        while let Some(node) = self.pop_free() {
            // SAFETY: nodes on the free chain are value-drained and owned
            // solely by this list.
            unsafe {
                drop(Box::from_raw(node));
            }
        }
    }
}

impl<T> Drop for LinkList<T> {
    fn drop(&mut self) {
        self.clear();
        self.shrink_free();

        // SAFETY: head and tail are valid pointers initialized in
        // `construct` and never modified except to be replaced with null
        // when freed.
        unsafe {
            if !self.head.is_null() {
                let _ = Box::from_raw(self.head);
                self.head = ptr::null_mut();
            }
            if !self.tail.is_null() {
                let _ = Box::from_raw(self.tail);
                self.tail = ptr::null_mut();
            }
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for LinkList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkList")
            .field("capacity", &self.cap)
            .field("length", &self.len)
            .field("free_len", &self.free_len)
            .finish()
    }
}
