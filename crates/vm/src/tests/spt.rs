use super::*;
use crate::page::{Backend, FileChunk, Initializer, Page, PageKind};

const BASE: usize = 0x1000_0000;

#[test]
fn test_insert_then_find() {
    let h = Harness::new(4, 4);
    let mut space = h.space();

    let page = Page::new_uninit(Vaddr(BASE + 0x123), true, PageKind::Anon, Initializer::Zero)
        .unwrap();
    assert!(space.spt_mut().insert(page));

    let found = space.spt().find(Vaddr(BASE + 0xfff)).expect("page not found");
    let found = found.lock();
    assert_eq!(found.va(), Vaddr(BASE));
    assert_eq!(found.kind(), PageKind::Anon);
    assert_eq!(found.backend().kind(), PageKind::Uninit);
    assert!(!found.is_resident());
    assert!(space.spt().find(Vaddr(BASE + PAGE_SIZE)).is_none());
}

#[test]
fn test_duplicate_insert_leaves_table_unchanged() {
    let h = Harness::new(4, 4);
    let mut space = h.space();

    space
        .allocate_lazy_page(PageKind::Anon, Vaddr(BASE), true, Initializer::Zero)
        .unwrap();
    let second = Page::new_uninit(Vaddr(BASE), false, PageKind::Anon, Initializer::Zero).unwrap();
    assert!(!space.spt_mut().insert(second));
    assert_eq!(
        space.allocate_lazy_page(PageKind::Anon, Vaddr(BASE + 8), false, Initializer::Zero),
        Err(VmError::AlreadyMapped)
    );

    assert_eq!(space.spt().len(), 1);
    let page = space.spt().find(Vaddr(BASE)).unwrap();
    assert!(page.lock().is_writable());
}

#[test]
fn test_file_kind_requires_mmap_initializer() {
    let h = Harness::new(4, 4);
    let mut space = h.space();

    assert_eq!(
        space.allocate_lazy_page(PageKind::File, Vaddr(BASE), true, Initializer::Zero),
        Err(VmError::InvalidArgument)
    );
    assert_eq!(
        space.allocate_lazy_page(PageKind::Uninit, Vaddr(BASE), true, Initializer::Zero),
        Err(VmError::InvalidArgument)
    );
    assert!(space.spt().is_empty());
}

#[test]
fn test_claim_fresh_anon_page_is_zeroed() {
    let h = Harness::new(4, 4);
    let mut space = h.space();

    space
        .allocate_lazy_page(PageKind::Anon, Vaddr(BASE), true, Initializer::Zero)
        .unwrap();
    space.claim_page(Vaddr(BASE)).unwrap();

    let page = space.spt().find(Vaddr(BASE)).unwrap();
    assert!(page.lock().is_resident());
    assert_eq!(page.lock().backend().kind(), PageKind::Anon);
    let flags = h.pt.flags(Vpn(BASE / PAGE_SIZE)).unwrap();
    assert!(flags.contains(PteFlags::USER | PteFlags::WRITABLE));

    assert!(user_read_page(&mut space, &h.pt, BASE).iter().all(|&b| b == 0));
    assert_eq!(h.frames.stats().in_use, 1);
    assert_eq!(h.frames.stats().pinned, 0);
}

#[test]
fn test_claim_unknown_address_fails() {
    let h = Harness::new(4, 4);
    let space = h.space();
    assert_eq!(space.claim_page(Vaddr(BASE)), Err(VmError::Unmapped));
}

#[test]
fn test_claim_twice_is_noop() {
    let h = Harness::new(4, 4);
    let mut space = h.space();

    space
        .allocate_lazy_page(PageKind::Anon, Vaddr(BASE), true, Initializer::Zero)
        .unwrap();
    space.claim_page(Vaddr(BASE)).unwrap();
    space.claim_page(Vaddr(BASE)).unwrap();
    assert_eq!(h.frames.stats().in_use, 1);
    assert_eq!(h.pt.map_calls(), 1);
}

#[test]
fn test_map_failure_releases_frame() {
    let h = Harness::new(4, 4);
    let pt = Arc::new(MockPageTable::with_capacity(0));
    let mut space = h.space_with(&pt);

    space
        .allocate_lazy_page(PageKind::Anon, Vaddr(BASE), true, Initializer::Zero)
        .unwrap();
    assert_eq!(space.claim_page(Vaddr(BASE)), Err(VmError::MapFailed));

    let page = space.spt().find(Vaddr(BASE)).unwrap();
    assert!(!page.lock().is_resident());
    assert_eq!(h.frames.stats().in_use, 0);
}

#[test]
fn test_segment_page_loads_file_then_zeros() {
    let h = Harness::new(4, 4);
    let mut space = h.space();
    let (_inode, file) = open_file(b"hello, segment");

    space
        .map_segment(&file, 0, Vaddr(BASE), 14, PAGE_SIZE - 14, false)
        .unwrap();
    {
        let page = space.spt().find(Vaddr(BASE)).unwrap();
        let page = page.lock();
        assert_eq!(page.kind(), PageKind::Anon);
        let chunk = page.file_chunk().unwrap();
        assert_eq!((chunk.offset, chunk.read_bytes, chunk.zero_bytes), (0, 14, PAGE_SIZE - 14));
    }

    let content = user_read_page(&mut space, &h.pt, BASE);
    assert_eq!(&content[..14], b"hello, segment");
    assert!(content[14..].iter().all(|&b| b == 0));

    let page = space.spt().find(Vaddr(BASE)).unwrap();
    assert!(matches!(page.lock().backend(), Backend::Anon(_)));
    assert!(!h.pt.flags(Vpn(BASE / PAGE_SIZE)).unwrap().contains(PteFlags::WRITABLE));
}

#[test]
fn test_segment_spans_multiple_pages() {
    let h = Harness::new(4, 4);
    let mut space = h.space();
    let data = pattern(3);
    let (_inode, file) = open_file(&data[..PAGE_SIZE / 2]);

    space
        .map_segment(&file, 0, Vaddr(BASE), PAGE_SIZE / 2, PAGE_SIZE * 2 - PAGE_SIZE / 2, true)
        .unwrap();
    assert_eq!(space.spt().len(), 2);

    let second = space.spt().find(Vaddr(BASE + PAGE_SIZE)).unwrap();
    let chunk: FileChunk = second.lock().file_chunk().unwrap().clone();
    assert_eq!(chunk.read_bytes, 0);
    assert_eq!(chunk.zero_bytes, PAGE_SIZE);
    assert!(user_read_page(&mut space, &h.pt, BASE + PAGE_SIZE).iter().all(|&b| b == 0));
}

#[test]
fn test_segment_rejects_misaligned_arguments() {
    let h = Harness::new(4, 4);
    let mut space = h.space();
    let (_inode, file) = open_file(b"x");

    assert_eq!(
        space.map_segment(&file, 0, Vaddr(BASE + 1), 1, PAGE_SIZE - 1, true),
        Err(VmError::InvalidArgument)
    );
    assert_eq!(
        space.map_segment(&file, 0, Vaddr(BASE), 1, 1, true),
        Err(VmError::InvalidArgument)
    );
}

#[test]
fn test_short_read_fails_claim_without_leaking() {
    let h = Harness::new(4, 4);
    let mut space = h.space();
    let (_inode, file) = open_file(b"tiny");

    space
        .map_segment(&file, 0, Vaddr(BASE), 100, PAGE_SIZE - 100, true)
        .unwrap();
    assert_eq!(space.claim_page(Vaddr(BASE)), Err(VmError::ShortRead));

    let page = space.spt().find(Vaddr(BASE)).unwrap();
    assert!(!page.lock().is_resident());
    assert_eq!(page.lock().backend().kind(), PageKind::Uninit);
    assert_eq!(h.frames.stats().in_use, 0);
    assert_eq!(h.pt.mapped_count(), 0);
}

#[test]
fn test_read_error_maps_to_io() {
    let h = Harness::new(4, 4);
    let mut space = h.space();
    let (inode, file) = open_file(&pattern(1));

    space
        .map_segment(&file, 0, Vaddr(BASE), PAGE_SIZE, 0, true)
        .unwrap();
    inode.set_fail_reads(true);
    assert_eq!(space.claim_page(Vaddr(BASE)), Err(VmError::Io));
}

#[test]
fn test_remove_releases_frame_and_mapping() {
    let h = Harness::new(4, 4);
    let mut space = h.space();

    space
        .allocate_lazy_page(PageKind::Anon, Vaddr(BASE), true, Initializer::Zero)
        .unwrap();
    space.claim_page(Vaddr(BASE)).unwrap();
    assert!(space.spt_mut().remove(Vaddr(BASE + 7)));

    assert!(space.spt().find(Vaddr(BASE)).is_none());
    assert_eq!(h.pt.mapped_count(), 0);
    assert_eq!(h.frames.stats().in_use, 0);
    assert!(!space.spt_mut().remove(Vaddr(BASE)));
}

#[test]
fn test_destroy_all_releases_everything() {
    let h = Harness::new(4, 8);
    {
        let mut space = h.space();
        for i in 0..6 {
            let va = BASE + i * PAGE_SIZE;
            space
                .allocate_lazy_page(PageKind::Anon, Vaddr(va), true, Initializer::Zero)
                .unwrap();
            user_write(&mut space, &h.pt, va, &[i as u8; 16]);
        }
        let stats = h.frames.stats();
        assert_eq!(stats.in_use, 4);
        assert!(stats.swap_used >= 2);
    }

    let stats = h.frames.stats();
    assert_eq!(stats.in_use, 0);
    assert_eq!(stats.swap_used, 0);
    assert_eq!(stats.free_pages, stats.capacity);
    assert_eq!(h.pt.mapped_count(), 0);
}

#[test]
fn test_setup_stack_claims_top_page() {
    let h = Harness::new(4, 4);
    let mut space = h.space();

    let sp = space.setup_stack().unwrap();
    assert_eq!(sp, Vaddr(stack_top()));
    assert_eq!(space.stack_bottom(), Vaddr(stack_top() - PAGE_SIZE));

    let page = space.spt().find(Vaddr(stack_top() - 1)).unwrap();
    assert!(page.lock().is_resident());
    assert_eq!(page.lock().kind(), PageKind::Anon);
}
