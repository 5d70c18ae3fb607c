use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};
use tracing::info;

/// Create the demo shop tables and fill them once
pub async fn seed(options: SqliteConnectOptions) -> Result<(), sqlx::Error> {
    let mut connection = options.create_if_missing(true).connect().await?;
    let mut transaction = connection.begin().await?;

    setup(&mut transaction).await?;
    seed_sample_data(&mut transaction).await?;

    transaction.commit().await?;
    connection.close().await
}

async fn setup(connection: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS customers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT UNIQUE NOT NULL,
            city TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(&mut *connection)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            price REAL NOT NULL,
            qty INTEGER DEFAULT 0,
            category TEXT
        )
        "#,
    )
    .execute(&mut *connection)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            customer_id INTEGER REFERENCES customers(id),
            product_id INTEGER REFERENCES products(id),
            quantity INTEGER NOT NULL,
            status TEXT DEFAULT 'pending',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(&mut *connection)
    .await?;

    // Keyed on two columns
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS order_notes (
            order_id INTEGER NOT NULL REFERENCES orders(id),
            line INTEGER NOT NULL,
            note TEXT,
            PRIMARY KEY (order_id, line)
        )
        "#,
    )
    .execute(&mut *connection)
    .await?;

    Ok(())
}

async fn seed_sample_data(connection: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    let customer_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
        .fetch_one(&mut *connection)
        .await?;

    if customer_count > 0 {
        info!("Demo data already present");
        return Ok(());
    }

    let first_names = [
        "Alice", "Bob", "Charlie", "Diana", "Evan", "Fiona", "George", "Hannah", "Isaac", "Julia",
    ];
    let last_names = [
        "Johnson", "Smith", "Brown", "Prince", "Davis", "Wilson", "Taylor",
    ];
    let cities = ["Berlin", "Lisbon", "Oslo", "Vienna", "Dublin"];

    for index in 0..35 {
        let first = first_names[index % first_names.len()];
        let last = last_names[index % last_names.len()];
        // every seventh customer has no city
        let city = (index % 7 != 6).then(|| cities[index % cities.len()]);

        sqlx::query("INSERT INTO customers (name, email, city) VALUES (?, ?, ?)")
            .bind(format!("{} {}", first, last))
            .bind(format!(
                "{}.{}{}@example.com",
                first.to_lowercase(),
                last.to_lowercase(),
                index
            ))
            .bind(city)
            .execute(&mut *connection)
            .await?;
    }

    let categories = ["Stationery", "Electronics", "Kitchen", "Garden"];
    let product_types = [
        "Pencil", "Notebook", "Stapler", "Lamp", "Cable", "Kettle", "Mug", "Trowel", "Hose",
    ];

    for index in 0..23 {
        let product_type = product_types[index % product_types.len()];
        let category = categories[index % categories.len()];
        let price = 0.99 + (index as f64 * 2.5);
        let quantity = (index * 13 + 4) % 120;

        sqlx::query("INSERT INTO products (name, price, qty, category) VALUES (?, ?, ?, ?)")
            .bind(format!("{} {}", product_type, index + 1))
            .bind(price)
            .bind(quantity as i64)
            .bind(category)
            .execute(&mut *connection)
            .await?;
    }

    let statuses = ["pending", "paid", "shipped", "delivered", "cancelled"];

    for index in 0..57_i64 {
        sqlx::query(
            "INSERT INTO orders (customer_id, product_id, quantity, status) VALUES (?, ?, ?, ?)",
        )
        .bind(index % 35 + 1)
        .bind(index % 23 + 1)
        .bind(index % 4 + 1)
        .bind(statuses[(index % 5) as usize])
        .execute(&mut *connection)
        .await?;
    }

    for order_id in 1..=6_i64 {
        for line in 1..=2_i64 {
            sqlx::query("INSERT INTO order_notes (order_id, line, note) VALUES (?, ?, ?)")
                .bind(order_id)
                .bind(line)
                .bind(format!("Note {} for order {}", line, order_id))
                .execute(&mut *connection)
                .await?;
        }
    }

    info!("Seeded demo shop data");
    Ok(())
}
