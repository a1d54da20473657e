use smallfor::ParallelSlice;
use smallfor::TaskPool;

// This example demonstrates how to parallel iterate a slice of data in chunks

fn main() -> smallfor::Result<()> {
    let messages: Vec<u64> = (0..100).collect();

    let task_pool = TaskPool::builder().thread_name("slice demo").build()?;

    let outputs = messages.par_chunk_map(&task_pool, 10, |values: &[u64]| {
        let mut sum = 0;
        for value in values {
            println!(
                "Processing value {} on thread {:?}",
                value,
                std::thread::current().name().unwrap_or("unnamed")
            );
            sum += value;
        }

        sum
    });

    println!("sums: {:?}", outputs);

    let halves = messages.par_splat_map(&task_pool, Some(2), |values: &[u64]| values.len());
    println!("splat into {} chunks: {:?}", halves.len(), halves);

    task_pool.shutdown()
}
