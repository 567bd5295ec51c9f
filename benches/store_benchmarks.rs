//! Benchmarks for bulk commits, resolution and full conversion.
//!
//! Workloads are synthetic Win32-style header sets of increasing size: typedef
//! chains, structs referencing them, constant expressions over earlier
//! constants, and procedures spread across two modules.
//!
//! ```bash
//! cargo bench --bench store_benchmarks -- "store/commit"
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use interop_core::{
    BuiltinKind, DefinedType, NativeConstant, NativeParameter, NativeProcedure, NativeRecord,
    NativeType, NativeTypeDef,
};
use interop_exports::{MemoryExportSource, ModuleList};
use interop_gen::{Converter, ConverterConfig, DeclarationSet};
use interop_resolver::{ResolverOptions, SymbolResolver};
use interop_store::DeclarationStore;

const SIZES: [usize; 3] = [100, 1_000, 10_000];

fn synthetic_set(size: usize) -> DeclarationSet {
    let mut set = DeclarationSet::new();
    for i in 0..size {
        let base = if i == 0 {
            NativeType::unsigned(BuiltinKind::Int32)
        } else {
            NativeType::named(format!("T{}", i - 1))
        };
        set = set
            .with_typedef(NativeTypeDef::new(format!("T{i}"), base))
            .with_defined_type(DefinedType::Struct(
                NativeRecord::new(format!("S{i}"))
                    .with_member("value", NativeType::named(format!("T{i}")))
                    .with_member("next", NativeType::pointer(NativeType::named(format!("S{i}")))),
            ))
            .with_constant(if i == 0 {
                NativeConstant::from_macro("C0", "0x10")
            } else {
                NativeConstant::from_macro(format!("C{i}"), format!("C{} + 1", i - 1))
            })
            .with_procedure(
                NativeProcedure::new(format!("Proc{i}"), NativeType::named("T0")).with_param(
                    NativeParameter::new("arg", NativeType::pointer(NativeType::named(format!("S{i}")))),
                ),
            );
    }
    set
}

fn synthetic_exports(size: usize) -> MemoryExportSource {
    let (even, odd): (Vec<_>, Vec<_>) = (0..size).partition(|i| i % 2 == 0);
    MemoryExportSource::new()
        .with_module("even.dll", even.into_iter().map(|i| format!("Proc{i}")))
        .with_module("odd.dll", odd.into_iter().map(|i| format!("Proc{i}")))
}

fn committed_store(size: usize) -> DeclarationStore {
    let mut store = DeclarationStore::new();
    store.set_fast_load(true);
    synthetic_set(size).stage_into(&mut store);
    store.commit();
    store.set_fast_load(false);
    store
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("store/commit");
    for size in SIZES {
        let set = synthetic_set(size);
        group.throughput(Throughput::Elements(set.len() as u64));
        for fast_load in [false, true] {
            let label = if fast_load { "fast_load" } else { "indexed" };
            group.bench_with_input(BenchmarkId::new(label, size), &set, |b, set| {
                b.iter(|| {
                    let mut store = DeclarationStore::new();
                    store.set_fast_load(fast_load);
                    set.clone().stage_into(&mut store);
                    black_box(store.commit())
                });
            });
        }
    }
    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    for size in SIZES {
        let store = committed_store(size);
        group.throughput(Throughput::Elements(store.len() as u64));

        group.bench_with_input(BenchmarkId::new("offline", size), &store, |b, store| {
            let resolver = SymbolResolver::new(ResolverOptions {
                resolve_calling_conventions: false,
                ..ResolverOptions::default()
            });
            b.iter(|| {
                let mut store = store.clone();
                black_box(resolver.resolve(&mut store))
            });
        });

        group.bench_with_input(BenchmarkId::new("with_exports", size), &store, |b, store| {
            let resolver = SymbolResolver::new(ResolverOptions::default());
            let modules = ModuleList::new(["even.dll", "odd.dll"]);
            b.iter(|| {
                let mut store = store.clone();
                let mut source = synthetic_exports(size);
                black_box(resolver.resolve_with_source(&mut store, &mut source, modules.clone()))
            });
        });
    }
    group.finish();
}

fn bench_convert(c: &mut Criterion) {
    let mut group = c.benchmark_group("convert");
    let converter = Converter::new(
        ConverterConfig::default().with_modules(ModuleList::new(["even.dll", "odd.dll"])),
    );
    for size in SIZES {
        let set = synthetic_set(size);
        group.throughput(Throughput::Elements(set.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &set, |b, set| {
            b.iter(|| {
                let mut source = synthetic_exports(size);
                black_box(converter.convert_with_source(set.clone(), &mut source))
            });
        });
    }
    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("store/snapshot");
    for size in SIZES {
        let bytes = match committed_store(size).serialize() {
            Ok(bytes) => bytes,
            Err(err) => panic!("snapshot failed: {err}"),
        };
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::new("load", size), &bytes, |b, bytes| {
            b.iter(|| black_box(DeclarationStore::deserialize(bytes)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_commit, bench_resolve, bench_convert, bench_snapshot);
criterion_main!(benches);
