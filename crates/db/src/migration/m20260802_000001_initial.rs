//! Initial database migration.
//!
//! Creates the master-data tables the engine reads (sites, items) and the
//! stock ledger schema it owns (documents, document lines, ledger entries,
//! balances).

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // Master data (CRUD lives elsewhere in the backend).
        db.execute_unprepared(SITES_SQL).await?;
        db.execute_unprepared(ITEMS_SQL).await?;

        // Stock documents and detail lines.
        db.execute_unprepared(STOCK_DOCUMENTS_SQL).await?;
        db.execute_unprepared(STOCK_DOCUMENT_LINES_SQL).await?;

        // The ledger and the derived balance cache.
        db.execute_unprepared(STOCK_ENTRIES_SQL).await?;
        db.execute_unprepared(STOCK_BALANCES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared("DROP TABLE IF EXISTS stock_balances").await?;
        db.execute_unprepared("DROP TABLE IF EXISTS stock_entries").await?;
        db.execute_unprepared("DROP TABLE IF EXISTS stock_document_lines")
            .await?;
        db.execute_unprepared("DROP TABLE IF EXISTS stock_documents").await?;
        db.execute_unprepared("DROP TABLE IF EXISTS items").await?;
        db.execute_unprepared("DROP TABLE IF EXISTS sites").await?;

        Ok(())
    }
}

const SITES_SQL: &str = r"
CREATE TABLE sites (
    id UUID PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";

const ITEMS_SQL: &str = r"
CREATE TABLE items (
    id UUID PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    unit TEXT NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";

const STOCK_DOCUMENTS_SQL: &str = r"
CREATE TABLE stock_documents (
    id UUID PRIMARY KEY,
    document_code TEXT NOT NULL,
    document_type TEXT NOT NULL,
    site_id UUID NOT NULL REFERENCES sites(id),
    dest_site_id UUID REFERENCES sites(id),
    entry_date DATE NOT NULL,
    total_amount NUMERIC(18, 2) NOT NULL DEFAULT 0,
    remarks TEXT,
    created_by UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_stock_documents_site_date ON stock_documents(site_id, entry_date);
";

const STOCK_DOCUMENT_LINES_SQL: &str = r"
CREATE TABLE stock_document_lines (
    id UUID PRIMARY KEY,
    document_id UUID NOT NULL REFERENCES stock_documents(id),
    item_id UUID NOT NULL REFERENCES items(id),
    received_qty NUMERIC(18, 4) NOT NULL DEFAULT 0,
    issued_qty NUMERIC(18, 4) NOT NULL DEFAULT 0,
    rate NUMERIC(18, 4) NOT NULL DEFAULT 0,
    amount NUMERIC(18, 2) NOT NULL DEFAULT 0,
    remark TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_stock_document_lines_document ON stock_document_lines(document_id);
";

const STOCK_ENTRIES_SQL: &str = r"
CREATE TABLE stock_entries (
    id UUID PRIMARY KEY,
    posting_seq BIGSERIAL NOT NULL,
    site_id UUID NOT NULL REFERENCES sites(id),
    item_id UUID NOT NULL REFERENCES items(id),
    entry_date DATE NOT NULL,
    document_type TEXT NOT NULL,
    document_id UUID NOT NULL REFERENCES stock_documents(id),
    received_qty NUMERIC(18, 4),
    issued_qty NUMERIC(18, 4),
    unit_rate NUMERIC(18, 4) NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT chk_stock_entries_single_sided
        CHECK (received_qty IS NULL OR issued_qty IS NULL)
);

CREATE INDEX idx_stock_entries_site_seq ON stock_entries(site_id, posting_seq);
CREATE INDEX idx_stock_entries_pair_seq ON stock_entries(site_id, item_id, posting_seq);
CREATE INDEX idx_stock_entries_document ON stock_entries(document_id);
";

const STOCK_BALANCES_SQL: &str = r"
CREATE TABLE stock_balances (
    id UUID PRIMARY KEY,
    site_id UUID NOT NULL REFERENCES sites(id),
    item_id UUID NOT NULL REFERENCES items(id),
    closing_stock NUMERIC(18, 4) NOT NULL DEFAULT 0,
    closing_value NUMERIC(18, 2) NOT NULL DEFAULT 0,
    unit_rate NUMERIC(18, 4) NOT NULL DEFAULT 0,
    last_movement TEXT NOT NULL DEFAULT '',
    version BIGINT NOT NULL DEFAULT 0,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT uq_stock_balances_site_item UNIQUE (site_id, item_id)
);
";
