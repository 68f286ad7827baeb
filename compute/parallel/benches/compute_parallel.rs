compute::criterion_benchmark!(compute_parallel);
