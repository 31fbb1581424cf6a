use super::*;
use crate::page::{Initializer, PageKind};

const BASE: usize = 0x5000_0000;

#[test]
fn test_fork_copies_resident_and_uninit_pages() {
    let h = Harness::new(4, 4);
    let mut parent = h.space();
    let (_inode, file) = open_file(&pattern(9));

    parent
        .allocate_lazy_page(PageKind::Anon, Vaddr(BASE), true, Initializer::Zero)
        .unwrap();
    user_write(&mut parent, &h.pt, BASE, &pattern(1));
    parent
        .map_segment(&file, 0, Vaddr(BASE + PAGE_SIZE), 300, PAGE_SIZE - 300, false)
        .unwrap();

    let child_pt = Arc::new(MockPageTable::new());
    let mut child = parent.fork(child_pt.clone()).unwrap();
    assert_eq!(child.spt().len(), 2);

    let parent_page = parent.spt().find(Vaddr(BASE)).unwrap();
    let child_page = child.spt().find(Vaddr(BASE)).unwrap();
    let parent_frame = parent_page.lock().frame().unwrap();
    let child_frame = child_page.lock().frame().unwrap();
    assert_ne!(parent_frame.kva(), child_frame.kva());
    assert_eq!(child_page.lock().kind(), PageKind::Anon);
    assert!(child_pt.is_mapped(Vpn(BASE / PAGE_SIZE)));
    assert_eq!(user_read_page(&mut child, &child_pt, BASE), pattern(1));

    let child_lazy = child.spt().find(Vaddr(BASE + PAGE_SIZE)).unwrap();
    {
        let lazy = child_lazy.lock();
        assert!(!lazy.is_resident());
        assert!(!lazy.is_writable());
        assert_eq!(lazy.kind(), PageKind::Anon);
        assert_eq!(lazy.backend().kind(), PageKind::Uninit);
        let chunk = lazy.file_chunk().unwrap();
        assert_eq!((chunk.offset, chunk.read_bytes), (0, 300));
    }
    let loaded = user_read_page(&mut child, &child_pt, BASE + PAGE_SIZE);
    assert_eq!(&loaded[..300], &pattern(9)[..300]);
    assert!(loaded[300..].iter().all(|&b| b == 0));
}

#[test]
fn test_fork_copies_are_independent() {
    let h = Harness::new(4, 4);
    let mut parent = h.space();
    parent
        .allocate_lazy_page(PageKind::Anon, Vaddr(BASE), true, Initializer::Zero)
        .unwrap();
    user_write(&mut parent, &h.pt, BASE, &pattern(1));

    let child_pt = Arc::new(MockPageTable::new());
    let mut child = parent.fork(child_pt.clone()).unwrap();
    user_write(&mut child, &child_pt, BASE, &pattern(2));

    assert_eq!(user_read_page(&mut parent, &h.pt, BASE), pattern(1));
    assert_eq!(user_read_page(&mut child, &child_pt, BASE), pattern(2));
}

#[test]
fn test_fork_of_swapped_out_page_keeps_parent_slot() {
    let h = Harness::new(2, 8);
    let mut parent = h.space();
    for i in 0..3 {
        parent
            .allocate_lazy_page(PageKind::Anon, Vaddr(BASE + i * PAGE_SIZE), true, Initializer::Zero)
            .unwrap();
        user_write(&mut parent, &h.pt, BASE + i * PAGE_SIZE, &pattern(i as u8));
    }
    let swapped = parent.spt().find(Vaddr(BASE)).unwrap();
    let slot = swapped.lock().swap_slot().expect("first page should be swapped out");

    let child_pt = Arc::new(MockPageTable::new());
    let mut child = parent.fork(child_pt.clone()).unwrap();

    assert_eq!(child.spt().len(), 3);
    for i in 0..3 {
        assert_eq!(
            user_read_page(&mut child, &child_pt, BASE + i * PAGE_SIZE),
            pattern(i as u8)
        );
    }
    assert!(!swapped.lock().is_resident());
    assert_eq!(swapped.lock().swap_slot(), Some(slot));
    for i in 0..3 {
        assert_eq!(
            user_read_page(&mut parent, &h.pt, BASE + i * PAGE_SIZE),
            pattern(i as u8)
        );
    }
}

#[test]
fn test_fork_shares_file_mapping() {
    let h = Harness::new(4, 4);
    let mut parent = h.space();
    let (inode, file) = open_file(&pattern(5));
    parent.mmap(Vaddr(BASE), PAGE_SIZE, true, &file, 0).unwrap();
    user_read_page(&mut parent, &h.pt, BASE);

    let child_pt = Arc::new(MockPageTable::new());
    let mut child = parent.fork(child_pt.clone()).unwrap();
    assert_eq!(inode.open_handles(), 2);

    let page = child.spt().find(Vaddr(BASE)).unwrap();
    assert_eq!(page.lock().kind(), PageKind::File);
    assert!(page.lock().is_resident());
    drop(page);

    user_write(&mut child, &child_pt, BASE, b"child");
    child.munmap(Vaddr(BASE)).unwrap();
    assert_eq!(&inode.contents()[..5], b"child");
    // 父进程仍持有映射
    assert_eq!(inode.open_handles(), 2);
}

#[test]
fn test_fork_keeps_unwritten_file_changes_across_eviction() {
    let h = Harness::new(2, 4);
    let mut parent = h.space();
    let (inode, file) = open_file(&[pattern(4), pattern(5)].concat());
    parent
        .mmap(Vaddr(BASE), 2 * PAGE_SIZE, true, &file, 0)
        .unwrap();
    user_write(&mut parent, &h.pt, BASE, b"dirty");
    assert!(inode.writes().is_empty());

    let child_pt = Arc::new(MockPageTable::new());
    let mut child = parent.fork(child_pt.clone()).unwrap();
    assert!(child_pt.is_dirty(Vpn(BASE / PAGE_SIZE)));

    // 子进程读第二页时淘汰自己的第一页，修改必须写回文件
    assert_eq!(user_read_page(&mut child, &child_pt, BASE + PAGE_SIZE), pattern(5));
    assert!(!child.spt().find(Vaddr(BASE)).unwrap().lock().is_resident());
    assert_eq!(inode.writes(), vec![(0, PAGE_SIZE)]);
    assert_eq!(&inode.contents()[..5], b"dirty");

    let page = user_read_page(&mut child, &child_pt, BASE);
    assert_eq!(&page[..5], b"dirty");
    assert_eq!(page[5..], pattern(4)[5..]);
}

#[test]
fn test_fork_preserves_stack_watermark() {
    let h = Harness::new(4, 4);
    let mut parent = h.space();
    parent.setup_stack().unwrap();
    let sp = stack_top() - PAGE_SIZE;
    let fault = PageFault {
        addr: Vaddr(sp - 8),
        user: true,
        write: true,
        not_present: true,
        stack_pointer: Vaddr(sp),
    };
    parent.handle_page_fault(&fault).unwrap();

    let child = parent.fork(Arc::new(MockPageTable::new())).unwrap();
    assert_eq!(child.stack_bottom(), parent.stack_bottom());
    assert_eq!(child.spt().len(), 2);
}

#[test]
fn test_dropping_child_leaves_parent_intact() {
    let h = Harness::new(4, 8);
    let mut parent = h.space();
    parent
        .allocate_lazy_page(PageKind::Anon, Vaddr(BASE), true, Initializer::Zero)
        .unwrap();
    user_write(&mut parent, &h.pt, BASE, &pattern(3));

    let child = parent.fork(Arc::new(MockPageTable::new())).unwrap();
    assert_eq!(h.frames.stats().in_use, 2);
    drop(child);

    assert_eq!(h.frames.stats().in_use, 1);
    assert_eq!(user_read_page(&mut parent, &h.pt, BASE), pattern(3));
}
