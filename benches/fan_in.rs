use std::{
  convert::Infallible,
  sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
  },
};

use bencher::{benchmark_group, benchmark_main, black_box, Bencher};
use rxcore::prelude::*;

fn merge_all_unbounded(b: &mut Bencher) {
  b.iter(|| {
    let sum = Arc::new(AtomicI64::new(0));
    let c_sum = sum.clone();
    observable::from_iter(0..100i64)
      .map(|i| observable::from_iter(i..i + 100))
      .merge_all(usize::MAX)
      .subscribe(move |v| {
        c_sum.fetch_add(v, Ordering::Relaxed);
      });
    black_box(sum.load(Ordering::Relaxed))
  });
}

fn concat_all_long_chain(b: &mut Bencher) {
  b.iter(|| {
    let count = Arc::new(AtomicI64::new(0));
    let c_count = count.clone();
    observable::from_iter(0..10_000)
      .map(observable::of)
      .concat_all()
      .subscribe(move |_| {
        c_count.fetch_add(1, Ordering::Relaxed);
      });
    black_box(count.load(Ordering::Relaxed))
  });
}

fn combine_latest_subjects(b: &mut Bencher) {
  b.iter(|| {
    let mut left = Subject::<i32, Infallible>::default();
    let mut right = Subject::<i32, Infallible>::default();
    let last = Arc::new(AtomicI64::new(0));
    let c_last = last.clone();
    let _handle = left
      .clone()
      .combine_latest(right.clone(), |a, b| a + b)
      .subscribe(move |v| c_last.store(v as i64, Ordering::Relaxed));
    for i in 0..1000 {
      left.next(i);
      right.next(i);
    }
    black_box(last.load(Ordering::Relaxed))
  });
}

fn group_by_partition(b: &mut Bencher) {
  b.iter(|| {
    let groups = Arc::new(AtomicI64::new(0));
    let c_groups = groups.clone();
    observable::from_iter(0..10_000).group_by(|v| v % 16).subscribe(move |group| {
      c_groups.fetch_add(1, Ordering::Relaxed);
      group.subscribe(|v| {
        black_box(v);
      });
    });
    black_box(groups.load(Ordering::Relaxed))
  });
}

benchmark_group!(
  benches,
  merge_all_unbounded,
  concat_all_long_chain,
  combine_latest_subjects,
  group_by_partition
);
benchmark_main!(benches);
