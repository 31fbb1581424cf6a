use super::*;
use crate::PhysPagePool;
use crate::swap::SwapTable;

#[test]
fn test_bitmap_pool_hands_out_zeroed_pages() {
    let memory = MockPhysMemory::new(3);
    let mut pool = unsafe { BitmapPagePool::new(Kva(memory.base()), memory.pages()) };
    assert_eq!(pool.capacity(), 3);

    let first = pool.get_page().unwrap();
    assert!(memory.contains(first.0));
    assert_eq!(first.0 % PAGE_SIZE, 0);
    unsafe { first.as_page_mut() }.fill(0xee);
    pool.free_page(first);

    let again = pool.get_page().unwrap();
    assert_eq!(again, first);
    assert!(unsafe { again.as_page() }.iter().all(|&b| b == 0));
}

#[test]
fn test_bitmap_pool_exhaustion() {
    let memory = MockPhysMemory::new(2);
    let mut pool = unsafe { BitmapPagePool::new(Kva(memory.base()), memory.pages()) };

    let a = pool.get_page().unwrap();
    let b = pool.get_page().unwrap();
    assert_ne!(a, b);
    assert!(pool.get_page().is_none());
    assert_eq!(pool.free_pages(), 0);

    pool.free_page(b);
    assert_eq!(pool.free_pages(), 1);
    assert_eq!(pool.get_page(), Some(b));
}

#[test]
fn test_swap_table_round_trip_frees_slot() {
    let disk = Arc::new(MockSwapDisk::new(2));
    let mut table = SwapTable::new(disk.clone());
    let mut page = [0u8; PAGE_SIZE];
    page.copy_from_slice(&pattern(42));

    let slot = table.swap_out(&page).unwrap();
    assert_eq!(table.used_slots(), 1);

    let mut back = [0u8; PAGE_SIZE];
    table.read(slot, &mut back).unwrap();
    assert_eq!(table.used_slots(), 1);

    back.fill(0);
    table.swap_in(slot, &mut back).unwrap();
    assert_eq!(back[..], page[..]);
    assert_eq!(table.used_slots(), 0);
    assert_eq!(disk.writes(), 1);
    assert_eq!(disk.reads(), 2);
}

#[test]
fn test_swap_table_full() {
    let disk = Arc::new(MockSwapDisk::new(1));
    let mut table = SwapTable::new(disk);
    let page = [1u8; PAGE_SIZE];

    let slot = table.swap_out(&page).unwrap();
    assert_eq!(table.swap_out(&page), Err(VmError::SwapFull));

    table.free(slot);
    assert!(table.swap_out(&page).is_ok());
    assert_eq!(table.total_slots(), 1);
}

#[test]
fn test_stats_track_frames() {
    let h = Harness::new(3, 5);
    let stats = h.frames.stats();
    assert_eq!(stats.capacity, 3);
    assert_eq!(stats.free_pages, 3);
    assert_eq!(stats.in_use, 0);
    assert_eq!(stats.swap_total, 5);
}
