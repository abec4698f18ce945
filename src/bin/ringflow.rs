// Copyright (c) 2019-2024 The ringflow developers
//
// This program is free software: you can redistribute it and/or
// modify it under the terms of the GNU General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see  <http://www.gnu.org/licenses/>
//

use time::OffsetDateTime;

use rustop::opts;

use ringflow::adjacency;
use ringflow::cluster::Cluster;
use ringflow::BlockPartitioner;

use std::process;

fn main() {
    env_logger::init();

    let (args, _) = opts! {
        synopsis "Compute the maximum flow of an adjacency-list instance on a ring of workers.";
        opt workers:usize=1, desc:"Number of workers in the ring.";
        param file:String, desc:"Adjacency-list instance file name";
        param threads:usize, desc:"Worker threads per worker";
    }
    .parse_or_exit();

    if args.workers < 1 || args.threads < 1 {
        eprintln!("Error: need at least one worker and one thread per worker");
        process::exit(1);
    }

    let instance = match adjacency::read_from_file(&args.file) {
        Ok(instance) => instance,
        Err(err) => {
            eprintln!("Error reading {}: {}", args.file, err);
            process::exit(2);
        }
    };
    if instance.vertices.len() < 2 {
        eprintln!("Error: {}: the instance needs a source and a sink vertex", args.file);
        process::exit(2);
    }

    let tstart = OffsetDateTime::now_utc();
    let cluster = Cluster::partition(instance, args.workers, &BlockPartitioner);
    let tend = OffsetDateTime::now_utc();
    println!("Partition time: {}", (tend - tstart).as_seconds_f64());

    let tstart = OffsetDateTime::now_utc();
    let solution = cluster.solve(args.threads);
    let tend = OffsetDateTime::now_utc();

    println!("Calculation complete!");
    println!();
    println!("Max flow: {}", solution.value);
    println!("Runtime: {}", (tend - tstart).as_seconds_f64());
}
