// Allocator and DynamicArray benchmarks
//
// Compares the bump arena against the heap backend for small typed
// allocations and for growing arrays.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kuuru_base::{Arena, DynamicArray, HeapAllocator};

/// Benchmark raw allocation throughput of a fresh arena.
fn bench_arena_alloc(c: &mut Criterion) {
    let mut group = c.benchmark_group("arena_alloc");

    for size in [8usize, 64, 512].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mut backing = vec![0u8; 1 << 20];
            let mut arena = Arena::from(&mut backing[..]);
            b.iter(|| {
                for _ in 0..64 {
                    black_box(arena.alloc(black_box(size), 8));
                }
                arena.reset();
            });
        });
    }

    group.finish();
}

/// Benchmark heap alloc/free pairs through the allocator handle.
fn bench_heap_alloc(c: &mut Criterion) {
    let mut group = c.benchmark_group("heap_alloc");
    let heap = HeapAllocator::get();

    for size in [8usize, 64, 512].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                if let Some(ptr) = heap.alloc(black_box(size), 8) {
                    unsafe { heap.free(ptr.as_ptr(), 8) };
                }
            });
        });
    }

    group.finish();
}

/// Benchmark appending to a DynamicArray on each backend.
fn bench_array_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("array_append");

    group.bench_function("heap", |b| {
        b.iter(|| {
            let mut arr = DynamicArray::create(HeapAllocator::get());
            for i in 0..1024u32 {
                arr.append(black_box(i));
            }
            black_box(arr.size())
        });
    });

    group.bench_function("arena", |b| {
        let mut backing = vec![0u8; 1 << 20];
        let mut arena = Arena::from(&mut backing[..]);
        b.iter(|| {
            {
                let mut arr = DynamicArray::create(arena.allocator());
                for i in 0..1024u32 {
                    arr.append(black_box(i));
                }
                black_box(arr.size());
            }
            arena.reset();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_arena_alloc, bench_heap_alloc, bench_array_append);
criterion_main!(benches);
