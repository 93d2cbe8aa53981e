use crate::format::table::Table;
use crate::format::util::{format_epoch_secs, format_size};
use crate::node::ClientNode;

pub fn handle_list(node: &ClientNode) -> i32 {
    match node.list_files() {
        Ok((status, files)) => {
            if !status.is_ok() {
                eprintln!("list: {}", status);
                return 1;
            }
            let mut table = Table::new(vec!["NAME", "SIZE", "MTIME", "CTIME"]);
            for f in &files {
                table.push_row(vec![
                    f.name.clone(),
                    format_size(f.file_size),
                    format_epoch_secs(f.mtime),
                    format_epoch_secs(f.ctime),
                ]);
            }
            print!("{}", table.render());
            println!("{} file(s)", files.len());
            0
        }
        Err(e) => {
            eprintln!("list: {}", e);
            1
        }
    }
}
